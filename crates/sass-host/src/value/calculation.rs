use super::{SassNumber, Value};

/// A `calc()`-style expression: `name(arguments...)`.
///
/// The compiler hands these to custom functions when an argument can't be
/// resolved to a plain number at compile time, and accepts them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Calculation {
    name: String,
    arguments: Vec<CalculationValue>,
}

impl Calculation {
    pub fn calc(argument: CalculationValue) -> Self {
        Self {
            name: "calc".to_string(),
            arguments: vec![argument],
        }
    }

    pub fn min(arguments: Vec<CalculationValue>) -> Self {
        Self {
            name: "min".to_string(),
            arguments,
        }
    }

    pub fn max(arguments: Vec<CalculationValue>) -> Self {
        Self {
            name: "max".to_string(),
            arguments,
        }
    }

    pub fn clamp(
        min: CalculationValue,
        value: CalculationValue,
        max: CalculationValue,
    ) -> Self {
        Self {
            name: "clamp".to_string(),
            arguments: vec![min, value, max],
        }
    }

    pub(crate) fn new(name: String, arguments: Vec<CalculationValue>) -> Self {
        Self { name, arguments }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[CalculationValue] {
        &self.arguments
    }
}

impl From<Calculation> for Value {
    fn from(calculation: Calculation) -> Self {
        Value::Calculation(calculation)
    }
}

/// One operand of a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CalculationValue {
    Number(SassNumber),
    /// An unquoted string such as a unit expression the compiler left
    /// unresolved.
    String(String),
    /// The result of an interpolated expression like `var(--gap)`.
    Interpolation(String),
    Operation {
        operator: CalculationOperator,
        left: Box<CalculationValue>,
        right: Box<CalculationValue>,
    },
    Calculation(Box<Calculation>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculationOperator {
    Plus,
    Minus,
    Times,
    Divide,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let sum = |left: f64, right: f64| CalculationValue::Operation {
            operator: CalculationOperator::Plus,
            left: Box::new(CalculationValue::Number(SassNumber::with_unit(left, "px"))),
            right: Box::new(CalculationValue::Number(SassNumber::with_unit(right, "em"))),
        };
        assert_eq!(Calculation::calc(sum(1.0, 2.0)), Calculation::calc(sum(1.0, 2.0)));
        assert_ne!(Calculation::calc(sum(1.0, 2.0)), Calculation::calc(sum(2.0, 1.0)));
        assert_ne!(
            Calculation::min(vec![sum(1.0, 2.0)]),
            Calculation::max(vec![sum(1.0, 2.0)])
        );
    }
}
