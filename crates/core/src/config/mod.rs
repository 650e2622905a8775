pub mod configuration;
pub mod conversions;
pub mod template;

pub use configuration::{
    Configuration, Maybe, ValueType, CONFIG_KEY, EXTENDS_KEY, MIXINS_KEY, MIXIN_KEY,
};
pub use conversions::{Color, ConversionService, Representation, StandardConversions};
