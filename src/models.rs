use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct Professional {
    pub id: u32,
    pub name: &'static str,
    pub profession: &'static str,
    pub location: &'static str,
    pub rating: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub id: u32,
    pub name: &'static str,
    pub professional_id: u32,
    pub description: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BookingDuration {
    #[default]
    #[serde(rename = "1")]
    OneHour,
    #[serde(rename = "2")]
    TwoHours,
    #[serde(rename = "3")]
    ThreeHours,
    #[serde(rename = "halfday")]
    HalfDay,
    #[serde(rename = "fullday")]
    FullDay,
}

impl BookingDuration {
    pub const ALL: [BookingDuration; 5] = [
        BookingDuration::OneHour,
        BookingDuration::TwoHours,
        BookingDuration::ThreeHours,
        BookingDuration::HalfDay,
        BookingDuration::FullDay,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            BookingDuration::OneHour => "1",
            BookingDuration::TwoHours => "2",
            BookingDuration::ThreeHours => "3",
            BookingDuration::HalfDay => "halfday",
            BookingDuration::FullDay => "fullday",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingDuration::OneHour => "1 Hour",
            BookingDuration::TwoHours => "2 Hours",
            BookingDuration::ThreeHours => "3 Hours",
            BookingDuration::HalfDay => "Half Day (4 Hours)",
            BookingDuration::FullDay => "Full Day (8 Hours)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    #[default]
    Standard,
    Premium,
    Express,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [ServiceType::Standard, ServiceType::Premium, ServiceType::Express];

    pub fn code(&self) -> &'static str {
        match self {
            ServiceType::Standard => "standard",
            ServiceType::Premium => "premium",
            ServiceType::Express => "express",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Standard => "Standard",
            ServiceType::Premium => "Premium",
            ServiceType::Express => "Express",
        }
    }
}

/// Form state preceding a confirmed booking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub customer_name: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration: BookingDuration,
    pub service_type: ServiceType,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingResult {
    pub booking_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub user_id: String,
    pub customer_name: String,
    pub professional_id: u32,
    pub professional_name: String,
    pub date: String,
    pub time: String,
    pub duration: BookingDuration,
    pub service_type: ServiceType,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub booking_id: String,
    pub user_id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_body_uses_camel_case_and_wire_codes() {
        let body = NewBooking {
            user_id: "u1".to_string(),
            customer_name: "Rajesh Kumar".to_string(),
            professional_id: 1,
            professional_name: "Rajesh Kumar".to_string(),
            date: "2026-10-20".to_string(),
            time: "09:30".to_string(),
            duration: BookingDuration::HalfDay,
            service_type: ServiceType::Premium,
            notes: String::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["professionalId"], 1);
        assert_eq!(json["duration"], "halfday");
        assert_eq!(json["serviceType"], "premium");
    }

    #[test]
    fn codes_parse_back() {
        for d in BookingDuration::ALL {
            assert_eq!(BookingDuration::from_code(d.code()), Some(d));
        }
        assert_eq!(ServiceType::from_code("express"), Some(ServiceType::Express));
        assert_eq!(ServiceType::from_code("deluxe"), None);
    }
}
