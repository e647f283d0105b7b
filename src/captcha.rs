use rand::Rng;

/// Arithmetic bot-deterrent shown on the login/signup form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    pub num1: u8,
    pub num2: u8,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaCheck {
    Correct,
    Missing,
    Wrong,
}

impl CaptchaChallenge {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        CaptchaChallenge {
            num1: rng.gen_range(0..10),
            num2: rng.gen_range(0..10),
            answer: String::new(),
        }
    }

    pub fn expected(&self) -> u32 {
        u32::from(self.num1) + u32::from(self.num2)
    }

    pub fn question(&self) -> String {
        format!("What is {} + {}?", self.num1, self.num2)
    }

    pub fn check(&self) -> CaptchaCheck {
        let answer = self.answer.trim();
        if answer.is_empty() {
            return CaptchaCheck::Missing;
        }
        match answer.parse::<u32>() {
            Ok(n) if n == self.expected() => CaptchaCheck::Correct,
            _ => CaptchaCheck::Wrong,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn operands_stay_single_digit() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let c = CaptchaChallenge::generate_with(&mut rng);
            assert!(c.num1 <= 9 && c.num2 <= 9);
            assert!(c.answer.is_empty());
        }
    }

    #[test]
    fn only_the_sum_is_accepted() {
        let mut c = CaptchaChallenge { num1: 4, num2: 7, answer: String::new() };
        assert_eq!(c.check(), CaptchaCheck::Missing);
        for n in 0..=18 {
            c.answer = n.to_string();
            let expected = if n == 11 { CaptchaCheck::Correct } else { CaptchaCheck::Wrong };
            assert_eq!(c.check(), expected, "answer {}", n);
        }
        c.answer = "eleven".into();
        assert_eq!(c.check(), CaptchaCheck::Wrong);
        c.answer = " 11 ".into();
        assert_eq!(c.check(), CaptchaCheck::Correct);
    }
}
