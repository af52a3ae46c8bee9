//! Уровень силы искажения (1-5)

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::SynthError;

/// Уровень силы искажения.
///
/// Снаружи адресуется с единицы (1..=5), внутри индексирует таблицы
/// параметров с нуля.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Все допустимые уровни по возрастанию
    pub const ALL: [Severity; 5] = [Severity(1), Severity(2), Severity(3), Severity(4), Severity(5)];

    /// Создание уровня с проверкой диапазона
    pub fn new(level: u8) -> Result<Self, SynthError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(SynthError::InvalidSeverity(level))
        }
    }

    /// Равномерный выбор уровня из [1, 5]
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(Self::MIN..=Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Индекс в таблице параметров (с нуля)
    pub fn index(self) -> usize {
        (self.0 - Self::MIN) as usize
    }

    /// Значение параметра для данного уровня
    pub fn pick<T: Copy>(self, table: &[T; 5]) -> T {
        table[self.index()]
    }
}

impl TryFrom<u8> for Severity {
    type Error = SynthError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> u8 {
        severity.0
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_range_validation() {
        assert!(Severity::new(0).is_err());
        assert!(Severity::new(6).is_err());
        assert_eq!(Severity::new(3).unwrap().index(), 2);
    }

    #[test]
    fn test_pick_is_one_based() {
        let table = [10, 20, 30, 40, 50];
        assert_eq!(Severity::new(1).unwrap().pick(&table), 10);
        assert_eq!(Severity::new(5).unwrap().pick(&table), 50);
    }

    #[test]
    fn test_sample_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let s = Severity::sample(&mut rng);
            assert!((1..=5).contains(&s.get()));
        }
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Severity>("0").is_err());
        assert!(serde_json::from_str::<Severity>("6").is_err());
        assert_eq!(serde_json::from_str::<Severity>("4").unwrap().get(), 4);
        assert_eq!(serde_json::to_string(&Severity::new(2).unwrap()).unwrap(), "2");
    }
}
