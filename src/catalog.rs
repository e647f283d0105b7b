use crate::models::{Professional, Service};

pub static PROFESSIONALS: &[Professional] = &[
    Professional { id: 1, name: "Rajesh Kumar", profession: "Plumber", location: "Mumbai", rating: 4.9 },
    Professional { id: 2, name: "Priya Sharma", profession: "Tutor (Math & Science)", location: "Bangalore", rating: 5.0 },
    Professional { id: 3, name: "Amit Patel", profession: "Web Designer", location: "Hyderabad", rating: 4.8 },
    Professional { id: 4, name: "Kavita Singh", profession: "Electrician", location: "Delhi", rating: 4.9 },
];

pub static SERVICES: &[Service] = &[
    Service { id: 1, name: "Plumbing Repair", professional_id: 1, description: "Fix leaks and pipes", icon: "🔧" },
    Service { id: 2, name: "Plumbing Installation", professional_id: 1, description: "Install new fixtures", icon: "🚰" },
    Service { id: 3, name: "Math Tutoring", professional_id: 2, description: "1-on-1 Math sessions", icon: "📐" },
    Service { id: 4, name: "Science Tutoring", professional_id: 2, description: "Science concepts explained", icon: "🧪" },
    Service { id: 5, name: "Web Design", professional_id: 3, description: "Professional web designs", icon: "🎨" },
    Service { id: 6, name: "Responsive Layout", professional_id: 3, description: "Mobile-friendly designs", icon: "📱" },
    Service { id: 7, name: "Electrical Repair", professional_id: 4, description: "Fix electrical issues", icon: "⚡" },
    Service { id: 8, name: "Electrical Installation", professional_id: 4, description: "Install new circuits", icon: "💡" },
];

/// Read-only view over the professionals and services fixture.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    professionals: &'static [Professional],
    services: &'static [Service],
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new(PROFESSIONALS, SERVICES)
    }
}

impl Catalog {
    pub fn new(professionals: &'static [Professional], services: &'static [Service]) -> Self {
        Catalog { professionals, services }
    }

    pub fn professionals(&self) -> &'static [Professional] {
        self.professionals
    }

    pub fn services(&self) -> &'static [Service] {
        self.services
    }

    pub fn professional(&self, id: u32) -> Option<&'static Professional> {
        self.professionals.iter().find(|p| p.id == id)
    }

    pub fn service(&self, id: u32) -> Option<&'static Service> {
        self.services.iter().find(|s| s.id == id)
    }

    // A service whose owner is missing from the fixture resolves to None.
    pub fn professional_for_service(&self, service_id: u32) -> Option<&'static Professional> {
        self.service(service_id)
            .and_then(|s| self.professional(s.professional_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_service_has_an_owner() {
        let catalog = Catalog::default();
        for service in catalog.services() {
            assert!(catalog.professional_for_service(service.id).is_some(), "{}", service.name);
        }
    }

    #[test]
    fn service_lookup_resolves_professional() {
        let catalog = Catalog::default();
        let pro = catalog.professional_for_service(4).unwrap();
        assert_eq!(pro.name, "Priya Sharma");
        assert!(catalog.professional_for_service(99).is_none());
    }

    #[test]
    fn dangling_service_owner_is_none() {
        static ORPHANS: &[Service] = &[Service {
            id: 1,
            name: "Orphan",
            professional_id: 42,
            description: "",
            icon: "",
        }];
        let catalog = Catalog::new(PROFESSIONALS, ORPHANS);
        assert!(catalog.professional_for_service(1).is_none());
    }
}
