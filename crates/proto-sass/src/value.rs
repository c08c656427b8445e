//! Wire representation of SassScript values.
//!
//! Values flow in both directions: the compiler serializes the arguments of
//! a custom function call, and the host serializes the function's result.

/// A SassScript value, as passed to and returned from host functions.
///
/// `value` is always set for messages on the wire; an unset value is a
/// protocol error.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Value {
    #[prost(oneof = "value_inner::Inner", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11")]
    pub value: Option<value_inner::Inner>,
}

pub mod value_inner {
    /// A quoted or unquoted string.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct String {
        #[prost(string, tag = "1")]
        pub text: ::prost::alloc::string::String,
        #[prost(bool, tag = "2")]
        pub quoted: bool,
    }

    /// A number, with its numerator and denominator units.
    ///
    /// Empty unit lists are simply absent on the wire; there is no
    /// distinction between a unitless number and one with empty unit lists.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Number {
        #[prost(double, tag = "1")]
        pub value: f64,
        #[prost(string, repeated, tag = "2")]
        pub numerators: Vec<::prost::alloc::string::String>,
        #[prost(string, repeated, tag = "3")]
        pub denominators: Vec<::prost::alloc::string::String>,
    }

    /// A first-class function defined in the stylesheet, identified by an
    /// opaque ID minted by the compiler.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct CompilerFunction {
        #[prost(uint32, tag = "1")]
        pub id: u32,
    }

    /// A function defined by the host, identified by an opaque ID minted by
    /// the host when the value was first serialized.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HostFunction {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        /// The Sass signature the function is declared with.
        #[prost(string, tag = "2")]
        pub signature: ::prost::alloc::string::String,
    }

    /// A first-class mixin defined in the stylesheet.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct CompilerMixin {
        #[prost(uint32, tag = "1")]
        pub id: u32,
    }

    /// The value of a rest argument, carrying any keyword arguments.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ArgumentList {
        /// An ID the host echoes in `accessed_argument_lists` if the
        /// keywords were read. The compiler assigns 0 to lists it doesn't
        /// care to track.
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(enumeration = "super::ListSeparator", tag = "2")]
        pub separator: i32,
        #[prost(message, repeated, tag = "3")]
        pub contents: Vec<super::Value>,
        #[prost(map = "string, message", tag = "4")]
        pub keywords: ::std::collections::HashMap<::prost::alloc::string::String, super::Value>,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Inner {
        #[prost(message, tag = "1")]
        String(String),
        #[prost(message, tag = "2")]
        Number(Number),
        #[prost(message, tag = "3")]
        Color(super::Color),
        #[prost(message, tag = "4")]
        List(super::List),
        #[prost(message, tag = "5")]
        Map(super::Map),
        #[prost(enumeration = "super::SingletonValue", tag = "6")]
        Singleton(i32),
        #[prost(message, tag = "7")]
        CompilerFunction(CompilerFunction),
        #[prost(message, tag = "8")]
        HostFunction(HostFunction),
        #[prost(message, tag = "9")]
        ArgumentList(ArgumentList),
        #[prost(message, tag = "10")]
        CompilerMixin(CompilerMixin),
        #[prost(message, tag = "11")]
        Calculation(super::Calculation),
    }
}

/// A color in a named color space, as three channels plus alpha.
///
/// The channel meanings depend on `space`: for `rgb` they're 0-255
/// red/green/blue, for `hsl` degrees/percent/percent, and so on.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Color {
    #[prost(string, tag = "1")]
    pub space: String,
    #[prost(double, tag = "2")]
    pub channel1: f64,
    #[prost(double, tag = "3")]
    pub channel2: f64,
    #[prost(double, tag = "4")]
    pub channel3: f64,
    #[prost(double, tag = "5")]
    pub alpha: f64,
}

/// An ordered list of values.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct List {
    /// May be `Undecided` only for lists of fewer than two elements.
    #[prost(enumeration = "ListSeparator", tag = "1")]
    pub separator: i32,
    #[prost(bool, tag = "2")]
    pub has_brackets: bool,
    #[prost(message, repeated, tag = "3")]
    pub contents: Vec<Value>,
}

/// A map of value pairs, in insertion order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Map {
    #[prost(message, repeated, tag = "1")]
    pub entries: Vec<MapEntry>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MapEntry {
    #[prost(message, optional, tag = "1")]
    pub key: Option<Value>,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Value>,
}

/// A `calc()`-style expression: `name(arguments...)`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Calculation {
    /// One of `calc`, `min`, `max` or `clamp`.
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub arguments: Vec<CalculationValue>,
}

/// A single operand of a calculation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CalculationValue {
    #[prost(oneof = "calculation_value::Inner", tags = "1, 2, 3, 4, 5")]
    pub value: Option<calculation_value::Inner>,
}

pub mod calculation_value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Inner {
        #[prost(message, tag = "1")]
        Number(super::value_inner::Number),
        /// An unquoted string, such as a variable or unit arithmetic the
        /// compiler left unresolved.
        #[prost(string, tag = "2")]
        String(::prost::alloc::string::String),
        /// The result of an interpolated expression.
        #[prost(string, tag = "3")]
        Interpolation(::prost::alloc::string::String),
        #[prost(message, tag = "4")]
        Operation(::prost::alloc::boxed::Box<super::CalculationOperation>),
        #[prost(message, tag = "5")]
        Calculation(::prost::alloc::boxed::Box<super::Calculation>),
    }
}

/// A binary operation between two calculation operands.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CalculationOperation {
    #[prost(enumeration = "CalculationOperator", tag = "1")]
    pub operator: i32,
    #[prost(message, optional, boxed, tag = "2")]
    pub left: Option<Box<CalculationValue>>,
    #[prost(message, optional, boxed, tag = "3")]
    pub right: Option<Box<CalculationValue>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ListSeparator {
    Comma = 0,
    Space = 1,
    Slash = 2,
    /// Only allowed for lists of fewer than two elements.
    Undecided = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SingletonValue {
    True = 0,
    False = 1,
    Null = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CalculationOperator {
    Plus = 0,
    Minus = 1,
    Times = 2,
    Divide = 3,
}
