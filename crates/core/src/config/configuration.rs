use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::{Map as JsonMap, Value as Json};
use url::Url;

use crate::config::conversions::{
    Color, ConversionService, Representation, StandardConversions,
};
use crate::config::template;
use crate::errors::CoreError;
use crate::foundation::traits::{Resource, UriResolver};
use crate::foundation::value::Value;

/// Reserved key naming a configuration to mix in under `flatten`.
pub const CONFIG_KEY: &str = "*config";
/// Reserved key naming a configuration to mix in under `flatten`.
pub const MIXIN_KEY: &str = "*mixin";
/// Reserved key naming an ordered list of configurations to mix in.
pub const MIXINS_KEY: &str = "*mixins";
/// Reserved key naming the configuration this one extends.
pub const EXTENDS_KEY: &str = "*extends";

/// A parsed component configuration.
///
/// Wraps nested key-value data and resolves dot-delimited key paths with the
/// value-prefix conventions (`$` parameter references, `?` templates, `@` URI
/// dereferences, `#` root cross-references, backtick escapes), converting
/// resolved values to requested representations. Configurations are never
/// mutated in place; composition operations always produce new instances.
#[derive(Clone)]
pub struct Configuration {
    /// The configuration data. Always a key-value mapping; list data is
    /// adapted to a string-indexed map at construction.
    data: Rc<JsonMap<String, Json>>,
    /// The data context for templated and parameter values. Parameter keys
    /// carry their `$` marker.
    context: Rc<HashMap<String, Json>>,
    /// The root configuration, used to resolve `#` cross-references.
    /// `None` means this configuration is its own root.
    root: Option<Rc<Configuration>>,
    /// Resolver for `@` URI references.
    resolver: Option<Rc<dyn UriResolver>>,
    /// Functions for converting between value representations.
    conversions: Rc<dyn ConversionService>,
}

impl Configuration {
    /// Root configuration constructor with the standard conversions and no
    /// URI resolver.
    pub fn new(data: Json) -> Self {
        Self::build(data, None, None, Rc::new(StandardConversions), Rc::new(HashMap::new()))
    }

    /// Root configuration constructor with a URI resolver.
    pub fn with_resolver(data: Json, resolver: Rc<dyn UriResolver>) -> Self {
        Self::with_services(data, Some(resolver), Rc::new(StandardConversions))
    }

    /// Root configuration constructor with explicit collaborator services.
    pub fn with_services(
        data: Json,
        resolver: Option<Rc<dyn UriResolver>>,
        conversions: Rc<dyn ConversionService>,
    ) -> Self {
        Self::build(data, None, resolver, conversions, Rc::new(HashMap::new()))
    }

    /// Parse a configuration from a JSON source string.
    pub fn from_json_str(source: &str) -> Result<Self, CoreError> {
        Ok(Self::new(serde_json::from_str(source)?))
    }

    /// Create a configuration from data and a parent configuration. The
    /// parent supplies the resolver, conversions and template context, and
    /// becomes the new configuration's root.
    pub fn derived(data: Json, parent: &Configuration) -> Self {
        Self::build(
            data,
            Some(parent.root_handle()),
            parent.resolver.clone(),
            parent.conversions.clone(),
            parent.context.clone(),
        )
    }

    fn build(
        data: Json,
        root: Option<Rc<Configuration>>,
        resolver: Option<Rc<dyn UriResolver>>,
        conversions: Rc<dyn ConversionService>,
        context: Rc<HashMap<String, Json>>,
    ) -> Self {
        let mut data = adapt_data(data, conversions.as_ref());
        // move parameter values out of the data and into the context
        let params: Vec<String> = data
            .keys()
            .filter(|key| key.starts_with('$'))
            .cloned()
            .collect();
        let context = if params.is_empty() {
            context
        } else {
            let mut extended = (*context).clone();
            for key in params {
                if let Some(value) = data.remove(&key) {
                    extended.insert(key, value);
                }
            }
            Rc::new(extended)
        };
        Configuration {
            data: Rc::new(data),
            context,
            root,
            resolver,
            conversions,
        }
    }

    /// The configuration data.
    pub fn data(&self) -> &JsonMap<String, Json> {
        &self.data
    }

    /// The root configuration used to resolve `#` cross-references.
    pub fn root(&self) -> &Configuration {
        self.root.as_deref().unwrap_or(self)
    }

    /// The configuration's URI resolver, if any.
    pub fn resolver(&self) -> Option<&Rc<dyn UriResolver>> {
        self.resolver.as_ref()
    }

    fn root_handle(&self) -> Rc<Configuration> {
        match &self.root {
            Some(root) => Rc::clone(root),
            None => Rc::new(self.clone()),
        }
    }

    /// Resolve a configuration value.
    ///
    /// Traverses the key path, recognizing value prefixes at each step, and
    /// converts the final value to the required representation. Returns
    /// `None` when no value is found or the conversion is not possible.
    pub fn value_as(&self, key_path: &str, representation: Representation) -> Option<Value> {
        let value = self.lookup(key_path, representation)?;
        self.convert(value, representation)
    }

    /// Key-path traversal without the final representation conversion. The
    /// representation still threads through `#` cross-references, which are
    /// resolved against the root with the caller's representation.
    fn lookup(&self, key_path: &str, representation: Representation) -> Option<Value> {
        let mut value: Option<Value> = None;
        for (i, key) in key_path.split('.').enumerate() {
            let next = if i == 0 {
                self.data.get(key).cloned().map(Value::Json)
            } else {
                let owner = value?;
                member_of(&owner, key)
            };
            value = next
                .filter(|v| !matches!(v, Value::Json(Json::Null)))
                .and_then(|v| self.resolve_prefixes(v, representation));
        }
        value
    }

    /// Apply the value-prefix rules to a resolved string value.
    fn resolve_prefixes(&self, value: Value, representation: Representation) -> Option<Value> {
        let Value::Json(Json::String(s)) = value else {
            return Some(value);
        };
        let mut s = s;
        let mut prefix = prefix_of(&s);
        // parameter references resolve first; a string result is fed back
        // through the remaining prefix rules
        if prefix == Some('$') {
            match self.context.get(&s) {
                Some(Json::String(next)) => {
                    s = next.clone();
                    prefix = prefix_of(&s);
                }
                Some(other) => return Some(Value::Json(other.clone())),
                None => return None,
            }
        }
        // strings beginning with ? are evaluated as string templates
        if prefix == Some('?') {
            s = template::render(&s[1..], &self.context);
            prefix = prefix_of(&s);
        }
        match prefix {
            // internal URI reference
            Some('@') => self.resolver.as_ref()?.dereference(&s[1..]),
            // potential path reference to a property of the root
            // configuration; falls back to the literal remainder when the
            // path doesn't resolve
            Some('#') => {
                let path = &s[1..];
                Some(
                    self.root()
                        .value_as(path, representation)
                        .unwrap_or_else(|| Value::Json(Json::String(path.to_string()))),
                )
            }
            // backtick escapes any other prefix
            Some('`') => Some(Value::Json(Json::String(s[1..].to_string()))),
            _ => Some(Value::Json(Json::String(s)))
        }
    }

    /// Convert a resolved value to the requested representation.
    fn convert(&self, value: Value, representation: Representation) -> Option<Value> {
        match representation {
            Representation::Bare => Some(value),
            // raw data view; resources convert through their own data
            Representation::Json => match value {
                Value::Resource(resource) => Some(Value::Json(resource.as_json())),
                other => Some(other),
            },
            Representation::Configuration | Representation::MaybeConfiguration => {
                self.configuration_from(value).map(Value::Config)
            }
            Representation::Resource => match value {
                Value::Resource(_) => Some(value),
                _ => None,
            },
            _ => match value {
                Value::Resource(resource) => resource.as_representation(representation),
                other => self.conversions.as_representation(&other, representation),
            },
        }
    }

    /// Wrap a resolved value as a child configuration, when possible.
    fn configuration_from(&self, value: Value) -> Option<Configuration> {
        match value {
            Value::Config(config) => Some(config),
            Value::Json(json @ (Json::Object(_) | Json::Array(_))) => {
                Some(Configuration::derived(json, self))
            }
            Value::Resource(resource) => Some(Configuration::derived(resource.as_json(), self)),
            _ => None,
        }
    }

    /// Test if a non-null configuration value exists at the specified key path.
    pub fn has_value(&self, key_path: &str) -> bool {
        self.value(key_path).is_some()
    }

    /// Get a configuration value in its bare representation, with no
    /// conversions applied.
    pub fn value(&self, key_path: &str) -> Option<Value> {
        self.value_as(key_path, Representation::Bare)
    }

    /// Get a configuration value as a string.
    pub fn get_string(&self, key_path: &str) -> Option<String> {
        match self.value_as(key_path, Representation::String)? {
            Value::Json(Json::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Get a configuration value as a string, with a default.
    pub fn get_string_or(&self, key_path: &str, default: &str) -> String {
        self.get_string(key_path)
            .unwrap_or_else(|| default.to_string())
    }

    /// Get a configuration value as a number.
    pub fn get_number(&self, key_path: &str) -> Option<f64> {
        match self.value_as(key_path, Representation::Number)? {
            Value::Json(Json::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Get a configuration value as a number, with a default.
    pub fn get_number_or(&self, key_path: &str, default: f64) -> f64 {
        self.get_number(key_path).unwrap_or(default)
    }

    /// Get a configuration value as a boolean.
    pub fn get_bool(&self, key_path: &str) -> Option<bool> {
        match self.value_as(key_path, Representation::Boolean)? {
            Value::Json(Json::Bool(b)) => Some(b),
            _ => None,
        }
    }

    /// Get a configuration value as a boolean, defaulting to false.
    pub fn get_bool_or(&self, key_path: &str, default: bool) -> bool {
        self.get_bool(key_path).unwrap_or(default)
    }

    /// Get a configuration value as a date.
    pub fn get_date(&self, key_path: &str) -> Option<DateTime<Utc>> {
        match self.value_as(key_path, Representation::Date)? {
            Value::Date(date) => Some(date),
            _ => None,
        }
    }

    /// Get a configuration value as a colour.
    pub fn get_color(&self, key_path: &str) -> Option<Color> {
        match self.value_as(key_path, Representation::Color)? {
            Value::Color(color) => Some(color),
            _ => None,
        }
    }

    /// Get a configuration value as a colour, with a default.
    pub fn get_color_or(&self, key_path: &str, default: Color) -> Color {
        self.get_color(key_path).unwrap_or(default)
    }

    /// Get a configuration value as an external URL.
    pub fn get_url(&self, key_path: &str) -> Option<Url> {
        match self.value_as(key_path, Representation::Url)? {
            Value::Url(url) => Some(url),
            _ => None,
        }
    }

    /// Get a configuration value as binary data.
    pub fn get_data(&self, key_path: &str) -> Option<Vec<u8>> {
        match self.value_as(key_path, Representation::Data)? {
            Value::Data(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Get a configuration value as an internal resource.
    pub fn get_resource(&self, key_path: &str) -> Option<Rc<dyn Resource>> {
        match self.value_as(key_path, Representation::Resource)? {
            Value::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    /// Get a configuration value as a normalized configuration object.
    pub fn get_configuration(&self, key_path: &str) -> Option<Configuration> {
        match self.value_as(key_path, Representation::Configuration)? {
            Value::Config(config) => Some(config.normalize()),
            _ => None,
        }
    }

    /// Get a configuration value as a configuration, with a default.
    pub fn get_configuration_or(&self, key_path: &str, default: Configuration) -> Configuration {
        self.get_configuration(key_path).unwrap_or(default)
    }

    /// Get a value that might itself be usable as a configuration. Whether
    /// it is isn't known until resolution time; the `Maybe` result carries
    /// the configuration wrapper (when constructible) alongside the
    /// underlying data and the original bare value.
    pub fn get_maybe(&self, key_path: &str) -> Option<Maybe> {
        let bare = self.lookup(key_path, Representation::MaybeConfiguration)?;
        Some(Maybe::new(bare, self))
    }

    /// Get a configuration value as a list of configuration objects. The
    /// bare value must be list-shaped; an item configuration is built for
    /// each entry.
    pub fn get_config_list(&self, key_path: &str) -> Vec<Configuration> {
        let mut value = self.value(key_path);
        if !matches!(value, Some(Value::Json(Json::Array(_)))) {
            value = self.value_as(key_path, Representation::Json);
        }
        let Some(Value::Json(Json::Array(items))) = value else {
            return Vec::new();
        };
        (0..items.len())
            .filter_map(|i| self.get_configuration(&format!("{key_path}.{i}")))
            .collect()
    }

    /// Get a configuration value as a map of configuration objects.
    pub fn get_config_map(&self, key_path: &str) -> HashMap<String, Configuration> {
        let mut result = HashMap::new();
        if let Some(Value::Json(Json::Object(map))) = self.value(key_path) {
            for key in map.keys() {
                if let Some(config) = self.get_configuration(&format!("{key_path}.{key}")) {
                    result.insert(key.clone(), config);
                }
            }
        }
        result
    }

    /// Return a list of the top-level value names in the configuration data.
    pub fn value_names(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Get the JSON type of a configuration value.
    pub fn value_type(&self, key_path: &str) -> ValueType {
        match self.value_as(key_path, Representation::Json) {
            None | Some(Value::Json(Json::Null)) => ValueType::Undefined,
            Some(Value::Json(Json::Bool(_))) => ValueType::Boolean,
            Some(Value::Json(Json::Number(_))) => ValueType::Number,
            Some(Value::Json(Json::String(_))) => ValueType::String,
            Some(Value::Json(Json::Array(_))) | Some(Value::List(_)) => ValueType::List,
            Some(_) => ValueType::Object,
        }
    }

    /// Create a new configuration by merging properties from another over
    /// this one. The merge is a top-level copy: names in the argument
    /// replace same-named values whole, with no deep merge. Root, context
    /// and resolver are taken from this configuration.
    pub fn mixin(&self, other: &Configuration) -> Configuration {
        self.merged(self, other)
    }

    /// Merge with reversed precedence: this configuration's values win over
    /// the argument's. Root, context and resolver are still taken from this
    /// configuration.
    pub fn mixover(&self, other: &Configuration) -> Configuration {
        self.merged(other, self)
    }

    fn merged(&self, base: &Configuration, overlay: &Configuration) -> Configuration {
        let mut data = (*base.data).clone();
        for (key, value) in overlay.data.iter() {
            data.insert(key.clone(), value.clone());
        }
        let mut context = (*base.context).clone();
        for (key, value) in overlay.context.iter() {
            context.insert(key.clone(), value.clone());
        }
        Configuration {
            data: Rc::new(data),
            context: Rc::new(context),
            root: Some(self.root_handle()),
            resolver: self.resolver.clone(),
            conversions: self.conversions.clone(),
        }
    }

    /// Extend this configuration with a set of named parameters.
    ///
    /// Parameters land in the template context under a `$`-prefixed key, so
    /// they can be used both as direct references (`"$param"`) and from
    /// within template strings (`"?x-{$param}"`). The original configuration
    /// is untouched; with no parameters it is returned as-is.
    pub fn extend_with_parameters(&self, params: HashMap<String, Json>) -> Configuration {
        if params.is_empty() {
            return self.clone();
        }
        let mut context = (*self.context).clone();
        for (name, value) in params {
            context.insert(format!("${name}"), value);
        }
        Configuration {
            data: Rc::clone(&self.data),
            context: Rc::new(context),
            root: Some(self.root_handle()),
            resolver: self.resolver.clone(),
            conversions: self.conversions.clone(),
        }
    }

    /// Flatten the configuration by merging in `*config`, `*mixin` and
    /// `*mixins` values, later entries overriding earlier ones.
    pub fn flatten(&self) -> Configuration {
        let mut result = self.clone();
        if let Some(mixin) = self.get_configuration(CONFIG_KEY) {
            result = result.mixin(&mixin);
        }
        if let Some(mixin) = self.get_configuration(MIXIN_KEY) {
            result = result.mixin(&mixin);
        }
        for mixin in self.get_config_list(MIXINS_KEY) {
            result = result.mixin(&mixin);
        }
        result
    }

    /// Normalize this configuration by flattening it and resolving its
    /// `*extends` chain into a single flat configuration.
    pub fn normalize(&self) -> Configuration {
        // Build the extension hierarchy. Each ancestor is flattened but not
        // re-normalized inside the walk, so a repeated flattened
        // configuration is caught by the guard and the walk terminates.
        let mut hierarchy = vec![self.flatten()];
        loop {
            let next = {
                let current = hierarchy.last().unwrap();
                match current.value_as(EXTENDS_KEY, Representation::Configuration) {
                    Some(Value::Config(config)) => Some(config.flatten()),
                    _ => None,
                }
            };
            let Some(next) = next else { break };
            if hierarchy.contains(&next) {
                // extension loop detected, stop building the hierarchy
                tracing::debug!("configuration extension cycle detected, truncating");
                break;
            }
            hierarchy.push(next);
        }
        // Fold the hierarchy from the most distant ancestor down to the
        // original configuration, so that descendant values win.
        let mut result = hierarchy.pop().unwrap();
        while let Some(config) = hierarchy.pop() {
            result = result.mixin(&config);
        }
        Configuration {
            root: Some(self.root_handle()),
            resolver: self.resolver.clone(),
            conversions: self.conversions.clone(),
            ..result
        }
    }

    /// Return a copy of the configuration with the named top-level keys
    /// removed.
    pub fn with_keys_excluded(&self, keys: &[&str]) -> Configuration {
        let mut data = (*self.data).clone();
        for key in keys {
            data.remove(*key);
        }
        Configuration {
            data: Rc::new(data),
            context: Rc::clone(&self.context),
            root: Some(self.root_handle()),
            resolver: self.resolver.clone(),
            conversions: self.conversions.clone(),
        }
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        *self.data == *other.data && *self.context == *other.context
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "data: {} context: {:?}",
            Json::Object((*self.data).clone()),
            self.context
        )
    }
}

/// Reduce arbitrary configuration data to a key-value mapping. Source
/// strings are parsed as JSON; lists are adapted to string-indexed maps.
fn adapt_data(data: Json, conversions: &dyn ConversionService) -> JsonMap<String, Json> {
    let data = match data {
        Json::String(source) => conversions.as_json_data(&source).unwrap_or(Json::Null),
        other => other,
    };
    match data {
        Json::Object(map) => map,
        Json::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        _ => JsonMap::new(),
    }
}

/// Look up a member of an intermediate value. Resource owners are converted
/// to their data representation before descent.
fn member_of(owner: &Value, key: &str) -> Option<Value> {
    let data = match owner {
        Value::Resource(resource) => resource.as_json(),
        Value::Json(json) => json.clone(),
        _ => return None,
    };
    match data {
        Json::Object(map) => map.get(key).cloned().map(Value::Json),
        Json::Array(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned())
            .map(Value::Json),
        _ => None,
    }
}

/// A prefix is only recognized on strings longer than one character.
fn prefix_of(s: &str) -> Option<char> {
    if s.len() > 1 {
        s.chars().next()
    } else {
        None
    }
}

/// An enumeration of configuration value types, corresponding to the
/// standard JSON types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Object,
    List,
    String,
    Number,
    Boolean,
    Undefined,
}

/// A configuration value that might itself be used as a configuration.
///
/// Used by the object configurer as an intermediate state while an object
/// graph is being built: whether the value is a configuration isn't known at
/// the point where it is read.
pub struct Maybe {
    /// The normalized configuration wrapper, when constructible.
    configuration: Option<Configuration>,
    /// The underlying configuration data.
    data: Json,
    /// The original bare value.
    bare: Value,
}

impl Maybe {
    fn new(bare: Value, parent: &Configuration) -> Self {
        let configuration = parent
            .configuration_from(bare.clone())
            .map(|config| config.normalize());
        let data = match &bare {
            Value::Resource(resource) => resource.as_json(),
            Value::Json(json) => json.clone(),
            Value::Config(config) => Json::Object((*config.data).clone()),
            _ => Json::Null,
        };
        Maybe {
            configuration,
            data,
            bare,
        }
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    pub fn data(&self) -> &Json {
        &self.data
    }

    pub fn bare(&self) -> &Value {
        &self.bare
    }
}
