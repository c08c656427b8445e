//! Conversion between the value graph and its wire representation.
//!
//! Decoding is strict: anything the compiler may not legally send (an
//! unset oneof, a host function, an undecided separator on a long list)
//! is a protocol error that kills the compilation's dispatcher.

use super::{
    ArgumentList, Calculation, CalculationOperator, CalculationValue, HostFunction, ListSeparator,
    SassColor, SassFunction, SassList, SassMap, SassMixin, SassNumber, SassString, Value,
};
use crate::{Error, Result};
use proto_sass::{calculation_value, value_inner};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Mints wire IDs for anonymous host functions embedded in a result value.
pub(crate) trait HostFunctionIds {
    fn register_anonymous(&mut self, function: &HostFunction) -> u32;
}

/// Collects the argument lists decoded from one function call request, so
/// the response can report which had their keywords read.
#[derive(Debug, Default)]
pub(crate) struct ArgumentListTracker {
    lists: Vec<(u32, Arc<AtomicBool>)>,
}

impl ArgumentListTracker {
    fn track(&mut self, id: u32, flag: Arc<AtomicBool>) {
        if id != 0 {
            self.lists.push((id, flag));
        }
    }

    pub fn accessed_ids(&self) -> Vec<u32> {
        self.lists
            .iter()
            .filter(|(_, flag)| flag.load(Ordering::Relaxed))
            .map(|(id, _)| *id)
            .collect()
    }
}

pub(crate) fn from_proto(
    value: proto_sass::Value,
    lists: &mut ArgumentListTracker,
) -> Result<Value> {
    use value_inner::Inner;

    let inner = value
        .value
        .ok_or_else(|| Error::CompilerProtocol("Value.value is not set".to_string()))?;

    Ok(match inner {
        Inner::String(string) => Value::String(if string.quoted {
            SassString::quoted(string.text)
        } else {
            SassString::unquoted(string.text)
        }),
        Inner::Number(number) => Value::Number(number_from_proto(number)),
        Inner::Color(color) => Value::Color(SassColor::new(
            color.space,
            [color.channel1, color.channel2, color.channel3],
            color.alpha,
        )),
        Inner::List(list) => {
            let separator = separator_from_proto(list.separator)?;
            let contents = list
                .contents
                .into_iter()
                .map(|element| from_proto(element, lists))
                .collect::<Result<Vec<_>>>()?;
            if separator == ListSeparator::Undecided && contents.len() > 1 {
                return Err(Error::CompilerProtocol(
                    "List.separator is UNDECIDED for a list of 2 or more elements".to_string(),
                ));
            }
            Value::List(SassList::new(contents, separator, list.has_brackets)?)
        }
        Inner::Map(map) => {
            let mut out = SassMap::new();
            for entry in map.entries {
                let key = entry.key.ok_or_else(|| {
                    Error::CompilerProtocol("MapEntry.key is not set".to_string())
                })?;
                let value = entry.value.ok_or_else(|| {
                    Error::CompilerProtocol("MapEntry.value is not set".to_string())
                })?;
                out.insert(from_proto(key, lists)?, from_proto(value, lists)?);
            }
            Value::Map(out)
        }
        Inner::Singleton(singleton) => match proto_sass::SingletonValue::try_from(singleton) {
            Ok(proto_sass::SingletonValue::True) => Value::Boolean(true),
            Ok(proto_sass::SingletonValue::False) => Value::Boolean(false),
            Ok(proto_sass::SingletonValue::Null) => Value::Null,
            Err(_) => {
                return Err(Error::CompilerProtocol(format!(
                    "unknown SingletonValue {singleton}"
                )))
            }
        },
        Inner::CompilerFunction(function) => {
            Value::Function(SassFunction::Compiler { id: function.id })
        }
        Inner::HostFunction(_) => {
            return Err(Error::CompilerProtocol(
                "the compiler may not send Value.host_function".to_string(),
            ))
        }
        Inner::ArgumentList(list) => {
            let separator = separator_from_proto(list.separator)?;
            let contents = list
                .contents
                .into_iter()
                .map(|element| from_proto(element, lists))
                .collect::<Result<Vec<_>>>()?;
            let keywords = list
                .keywords
                .into_iter()
                .map(|(name, value)| Ok((name, from_proto(value, lists)?)))
                .collect::<Result<indexmap::IndexMap<_, _>>>()?;
            let out = ArgumentList::with_id(list.id, contents, keywords, separator);
            lists.track(list.id, out.accessed_flag());
            Value::ArgumentList(out)
        }
        Inner::CompilerMixin(mixin) => Value::Mixin(SassMixin::new(mixin.id)),
        Inner::Calculation(calculation) => Value::Calculation(calculation_from_proto(calculation)?),
    })
}

pub(crate) fn to_proto(value: &Value, ids: &mut dyn HostFunctionIds) -> proto_sass::Value {
    use value_inner::Inner;

    let inner = match value {
        Value::Null => Inner::Singleton(proto_sass::SingletonValue::Null as i32),
        Value::Boolean(true) => Inner::Singleton(proto_sass::SingletonValue::True as i32),
        Value::Boolean(false) => Inner::Singleton(proto_sass::SingletonValue::False as i32),
        Value::Number(number) => Inner::Number(number_to_proto(number)),
        Value::String(string) => Inner::String(value_inner::String {
            text: string.text().to_string(),
            quoted: string.is_quoted(),
        }),
        Value::Color(color) => {
            let [channel1, channel2, channel3] = color.channels();
            Inner::Color(proto_sass::Color {
                space: color.space().to_string(),
                channel1,
                channel2,
                channel3,
                alpha: color.alpha(),
            })
        }
        Value::List(list) => Inner::List(proto_sass::List {
            separator: separator_to_proto(list.separator()) as i32,
            has_brackets: list.has_brackets(),
            contents: list
                .elements()
                .iter()
                .map(|element| to_proto(element, ids))
                .collect(),
        }),
        Value::ArgumentList(list) => Inner::ArgumentList(value_inner::ArgumentList {
            id: list.id(),
            separator: separator_to_proto(list.separator()) as i32,
            contents: list
                .elements()
                .iter()
                .map(|element| to_proto(element, ids))
                .collect(),
            keywords: list
                .keywords_unobserved()
                .iter()
                .map(|(name, value)| (name.clone(), to_proto(value, ids)))
                .collect(),
        }),
        Value::Map(map) => Inner::Map(proto_sass::Map {
            entries: map
                .iter()
                .map(|(key, value)| proto_sass::MapEntry {
                    key: Some(to_proto(key, ids)),
                    value: Some(to_proto(value, ids)),
                })
                .collect(),
        }),
        Value::Function(SassFunction::Compiler { id }) => {
            Inner::CompilerFunction(value_inner::CompilerFunction { id: *id })
        }
        Value::Function(SassFunction::Host(function)) => {
            Inner::HostFunction(value_inner::HostFunction {
                id: ids.register_anonymous(function),
                signature: function.signature().to_string(),
            })
        }
        Value::Mixin(mixin) => Inner::CompilerMixin(value_inner::CompilerMixin { id: mixin.id() }),
        Value::Calculation(calculation) => Inner::Calculation(calculation_to_proto(calculation)),
    };

    proto_sass::Value { value: Some(inner) }
}

fn number_from_proto(number: value_inner::Number) -> SassNumber {
    SassNumber::with_units(number.value, number.numerators, number.denominators)
}

fn number_to_proto(number: &SassNumber) -> value_inner::Number {
    value_inner::Number {
        value: number.value(),
        numerators: number.numerator_units().to_vec(),
        denominators: number.denominator_units().to_vec(),
    }
}

fn calculation_from_proto(calculation: proto_sass::Calculation) -> Result<Calculation> {
    let arguments = calculation
        .arguments
        .into_iter()
        .map(calculation_value_from_proto)
        .collect::<Result<Vec<_>>>()?;
    Ok(Calculation::new(calculation.name, arguments))
}

fn calculation_value_from_proto(value: proto_sass::CalculationValue) -> Result<CalculationValue> {
    use calculation_value::Inner;

    let inner = value
        .value
        .ok_or_else(|| Error::CompilerProtocol("CalculationValue.value is not set".to_string()))?;

    Ok(match inner {
        Inner::Number(number) => CalculationValue::Number(number_from_proto(number)),
        Inner::String(string) => CalculationValue::String(string),
        Inner::Interpolation(interpolation) => CalculationValue::Interpolation(interpolation),
        Inner::Operation(operation) => {
            let operator = match proto_sass::CalculationOperator::try_from(operation.operator) {
                Ok(proto_sass::CalculationOperator::Plus) => CalculationOperator::Plus,
                Ok(proto_sass::CalculationOperator::Minus) => CalculationOperator::Minus,
                Ok(proto_sass::CalculationOperator::Times) => CalculationOperator::Times,
                Ok(proto_sass::CalculationOperator::Divide) => CalculationOperator::Divide,
                Err(_) => {
                    return Err(Error::CompilerProtocol(format!(
                        "unknown CalculationOperator {}",
                        operation.operator
                    )))
                }
            };
            let left = operation.left.ok_or_else(|| {
                Error::CompilerProtocol("CalculationOperation.left is not set".to_string())
            })?;
            let right = operation.right.ok_or_else(|| {
                Error::CompilerProtocol("CalculationOperation.right is not set".to_string())
            })?;
            CalculationValue::Operation {
                operator,
                left: Box::new(calculation_value_from_proto(*left)?),
                right: Box::new(calculation_value_from_proto(*right)?),
            }
        }
        Inner::Calculation(calculation) => {
            CalculationValue::Calculation(Box::new(calculation_from_proto(*calculation)?))
        }
    })
}

fn calculation_to_proto(calculation: &Calculation) -> proto_sass::Calculation {
    proto_sass::Calculation {
        name: calculation.name().to_string(),
        arguments: calculation
            .arguments()
            .iter()
            .map(calculation_value_to_proto)
            .collect(),
    }
}

fn calculation_value_to_proto(value: &CalculationValue) -> proto_sass::CalculationValue {
    use calculation_value::Inner;

    let inner = match value {
        CalculationValue::Number(number) => Inner::Number(number_to_proto(number)),
        CalculationValue::String(string) => Inner::String(string.clone()),
        CalculationValue::Interpolation(interpolation) => {
            Inner::Interpolation(interpolation.clone())
        }
        CalculationValue::Operation {
            operator,
            left,
            right,
        } => {
            let operator = match operator {
                CalculationOperator::Plus => proto_sass::CalculationOperator::Plus,
                CalculationOperator::Minus => proto_sass::CalculationOperator::Minus,
                CalculationOperator::Times => proto_sass::CalculationOperator::Times,
                CalculationOperator::Divide => proto_sass::CalculationOperator::Divide,
            };
            Inner::Operation(Box::new(proto_sass::CalculationOperation {
                operator: operator as i32,
                left: Some(Box::new(calculation_value_to_proto(left))),
                right: Some(Box::new(calculation_value_to_proto(right))),
            }))
        }
        CalculationValue::Calculation(calculation) => {
            Inner::Calculation(Box::new(calculation_to_proto(calculation)))
        }
    };

    proto_sass::CalculationValue { value: Some(inner) }
}

fn separator_from_proto(separator: i32) -> Result<ListSeparator> {
    match proto_sass::ListSeparator::try_from(separator) {
        Ok(proto_sass::ListSeparator::Comma) => Ok(ListSeparator::Comma),
        Ok(proto_sass::ListSeparator::Space) => Ok(ListSeparator::Space),
        Ok(proto_sass::ListSeparator::Slash) => Ok(ListSeparator::Slash),
        Ok(proto_sass::ListSeparator::Undecided) => Ok(ListSeparator::Undecided),
        Err(_) => Err(Error::CompilerProtocol(format!(
            "unknown ListSeparator {separator}"
        ))),
    }
}

fn separator_to_proto(separator: ListSeparator) -> proto_sass::ListSeparator {
    match separator {
        ListSeparator::Comma => proto_sass::ListSeparator::Comma,
        ListSeparator::Space => proto_sass::ListSeparator::Space,
        ListSeparator::Slash => proto_sass::ListSeparator::Slash,
        ListSeparator::Undecided => proto_sass::ListSeparator::Undecided,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct StubIds(Vec<String>);

    impl HostFunctionIds for StubIds {
        fn register_anonymous(&mut self, function: &HostFunction) -> u32 {
            self.0.push(function.signature().to_string());
            self.0.len() as u32
        }
    }

    fn round_trip(value: Value) {
        let mut ids = StubIds::default();
        let mut lists = ArgumentListTracker::default();
        let wire = to_proto(&value, &mut ids);
        assert_eq!(from_proto(wire, &mut lists).unwrap(), value);
    }

    #[test]
    fn test_round_trips() {
        round_trip(Value::Null);
        round_trip(Value::Boolean(true));
        round_trip(Value::Boolean(false));
        round_trip(Value::Number(SassNumber::with_units(
            96.0,
            vec!["px".to_string()],
            vec!["s".to_string()],
        )));
        round_trip(Value::String(SassString::quoted("hello")));
        round_trip(Value::String(SassString::unquoted("bold")));
        round_trip(Value::Color(SassColor::rgb(12.0, 34.0, 56.0)));
        round_trip(Value::List(
            SassList::new(
                vec![Value::Null, Value::Boolean(true)],
                ListSeparator::Slash,
                true,
            )
            .unwrap(),
        ));
        round_trip(Value::Map(
            [(Value::from(1.0), Value::from(true))].into_iter().collect(),
        ));
        round_trip(Value::Function(SassFunction::Compiler { id: 9 }));
        round_trip(Value::Mixin(SassMixin::new(4)));
        round_trip(Value::Calculation(Calculation::calc(
            CalculationValue::Operation {
                operator: CalculationOperator::Divide,
                left: Box::new(CalculationValue::Number(SassNumber::new(1.0))),
                right: Box::new(CalculationValue::Interpolation("var(--x)".to_string())),
            },
        )));
    }

    #[test]
    fn test_empty_list_with_undecided_separator_round_trips() {
        round_trip(Value::List(SassList::empty()));
    }

    #[test]
    fn test_rejects_undecided_separator_for_long_list() {
        let wire = proto_sass::Value {
            value: Some(value_inner::Inner::List(proto_sass::List {
                separator: proto_sass::ListSeparator::Undecided as i32,
                has_brackets: false,
                contents: vec![
                    to_proto(&Value::Null, &mut StubIds::default()),
                    to_proto(&Value::Null, &mut StubIds::default()),
                ],
            })),
        };
        let err = from_proto(wire, &mut ArgumentListTracker::default()).unwrap_err();
        assert!(
            matches!(&err, Error::CompilerProtocol(m) if m.contains("UNDECIDED")),
            "{err}"
        );
    }

    #[test]
    fn test_rejects_inbound_host_function() {
        let wire = proto_sass::Value {
            value: Some(value_inner::Inner::HostFunction(
                value_inner::HostFunction {
                    id: 1,
                    signature: "f()".to_string(),
                },
            )),
        };
        let err = from_proto(wire, &mut ArgumentListTracker::default()).unwrap_err();
        assert!(matches!(err, Error::CompilerProtocol(_)), "{err}");
    }

    #[test]
    fn test_host_function_registration() {
        let mut ids = StubIds::default();
        let function = HostFunction::new("darken($c)", |_| Ok(Value::Null));
        let wire = to_proto(
            &Value::Function(SassFunction::Host(function)),
            &mut ids,
        );
        match wire.value {
            Some(value_inner::Inner::HostFunction(hf)) => {
                assert_eq!(hf.id, 1);
                assert_eq!(hf.signature, "darken($c)");
            }
            other => panic!("unexpected wire value: {other:?}"),
        }
        assert_eq!(ids.0, vec!["darken($c)".to_string()]);
    }

    #[test]
    fn test_argument_list_tracking() {
        let wire = proto_sass::Value {
            value: Some(value_inner::Inner::ArgumentList(
                value_inner::ArgumentList {
                    id: 12,
                    separator: proto_sass::ListSeparator::Comma as i32,
                    contents: Vec::new(),
                    keywords: [(
                        "weight".to_string(),
                        to_proto(&Value::from(0.5), &mut StubIds::default()),
                    )]
                    .into_iter()
                    .collect(),
                },
            )),
        };

        let mut lists = ArgumentListTracker::default();
        let value = from_proto(wire, &mut lists).unwrap();
        assert_eq!(lists.accessed_ids(), Vec::<u32>::new());

        let Value::ArgumentList(list) = value else {
            panic!("expected an argument list");
        };
        assert_eq!(list.keywords().len(), 1);
        assert_eq!(lists.accessed_ids(), vec![12]);
    }
}
