//! Queryable type graph built from repaired SDL.
//!
//! A [`SchemaIndex`] is built once from a single [`SchemaText`] snapshot and
//! never mutated afterwards. If the schema changes, build a new index.
//!
//! [`SchemaText`]: crate::schema::SchemaText

use std::collections::BTreeMap;
use std::fmt;

use graphql_parser::schema::{
    Definition, Directive, EnumValue, Field, InputValue, Type, TypeDefinition as SdlType,
    TypeExtension, Value,
};
use serde::{Serialize, Serializer};

use crate::schema::repair::BUILTIN_SCALARS;

/// Reason reported for `@deprecated` without an explicit `reason`.
pub const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// The SDL could not be turned into an index.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct SchemaParseError(pub String);

/// Kind of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    Scalar,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "OBJECT",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::InputObject => "INPUT_OBJECT",
            Self::Scalar => "SCALAR",
        }
    }

    /// Parse a kind as a caller would type it (`object`, `INPUT_OBJECT`, `input`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "object" | "type" => Some(Self::Object),
            "interface" => Some(Self::Interface),
            "union" => Some(Self::Union),
            "enum" => Some(Self::Enum),
            "input" | "input_object" | "inputobject" => Some(Self::InputObject),
            "scalar" => Some(Self::Scalar),
            _ => None,
        }
    }

    /// Whether selections on this type must have a sub-selection.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object | Self::Interface | Self::Union)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared type reference, wrappers included (`[Team!]!`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// The named type with list and non-null wrappers stripped.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    fn from_sdl(ty: Type<'_, String>) -> Self {
        match ty {
            Type::NamedType(name) => Self::Named(name),
            Type::ListType(inner) => Self::List(Box::new(Self::from_sdl(*inner))),
            Type::NonNullType(inner) => Self::NonNull(Box::new(Self::from_sdl(*inner))),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An argument or input-object field.
#[derive(Debug, Clone)]
pub struct InputValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub value_type: TypeRef,
    pub default_value: Option<String>,
}

impl InputValueDefinition {
    /// Non-null with no default: callers must supply it.
    pub fn is_required(&self) -> bool {
        self.value_type.is_non_null() && self.default_value.is_none()
    }

    fn from_sdl(value: InputValue<'_, String>) -> Self {
        Self {
            name: value.name,
            description: value.description,
            value_type: TypeRef::from_sdl(value.value_type),
            default_value: value.default_value.as_ref().map(format_value),
        }
    }
}

/// A field on an object or interface.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub description: Option<String>,
    pub field_type: TypeRef,
    pub arguments: Vec<InputValueDefinition>,
    pub deprecation: Option<String>,
}

impl FieldDefinition {
    pub fn argument(&self, name: &str) -> Option<&InputValueDefinition> {
        self.arguments.iter().find(|a| a.name == name)
    }

    fn from_sdl(field: Field<'_, String>) -> Self {
        Self {
            deprecation: deprecation_reason(&field.directives),
            name: field.name,
            description: field.description,
            field_type: TypeRef::from_sdl(field.field_type),
            arguments: field
                .arguments
                .into_iter()
                .map(InputValueDefinition::from_sdl)
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: Option<String>,
}

impl EnumValueDefinition {
    fn from_sdl(value: EnumValue<'_, String>) -> Self {
        Self {
            deprecation: deprecation_reason(&value.directives),
            name: value.name,
            description: value.description,
        }
    }
}

/// One named type in the schema.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    pub description: Option<String>,
    /// Output fields (objects and interfaces).
    pub fields: Vec<FieldDefinition>,
    /// Input fields (input objects).
    pub input_fields: Vec<InputValueDefinition>,
    pub enum_values: Vec<EnumValueDefinition>,
    pub union_members: Vec<String>,
    /// Interfaces this type declares it implements.
    pub interfaces: Vec<String>,
}

impl TypeDefinition {
    fn new(name: String, kind: TypeKind, description: Option<String>) -> Self {
        Self {
            name,
            kind,
            description,
            fields: Vec::new(),
            input_fields: Vec::new(),
            enum_values: Vec::new(),
            union_members: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_builtin(&self) -> bool {
        self.kind == TypeKind::Scalar && BUILTIN_SCALARS.contains(&self.name.as_str())
    }
}

/// Parsed, read-only view of a schema.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    types: BTreeMap<String, TypeDefinition>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl SchemaIndex {
    /// Parse SDL into an index. Malformed SDL is an error; there is no
    /// partial index.
    pub fn parse(sdl: &str) -> Result<Self, SchemaParseError> {
        let document = graphql_parser::parse_schema::<String>(sdl)
            .map_err(|e| SchemaParseError(e.to_string()))?;

        let mut types: BTreeMap<String, TypeDefinition> = BTreeMap::new();
        let mut extensions = Vec::new();
        let mut roots = (None, None, None);

        for definition in document.definitions {
            match definition {
                Definition::SchemaDefinition(schema) => {
                    roots = (schema.query, schema.mutation, schema.subscription);
                }
                Definition::TypeDefinition(def) => {
                    let def = convert_type(def);
                    if types.contains_key(&def.name) {
                        return Err(SchemaParseError(format!(
                            "type '{}' is defined more than once",
                            def.name
                        )));
                    }
                    types.insert(def.name.clone(), def);
                }
                Definition::TypeExtension(ext) => extensions.push(ext),
                Definition::DirectiveDefinition(_) => {}
            }
        }

        // Extensions may precede their base definition in the document.
        for ext in extensions {
            apply_extension(&mut types, ext)?;
        }

        for name in BUILTIN_SCALARS {
            types
                .entry(name.to_string())
                .or_insert_with(|| TypeDefinition::new(name.to_string(), TypeKind::Scalar, None));
        }

        let root = |explicit: Option<String>, conventional: &str| {
            explicit.or_else(|| {
                types
                    .contains_key(conventional)
                    .then(|| conventional.to_string())
            })
        };
        let query_type = root(roots.0, "Query");
        let mutation_type = root(roots.1, "Mutation");
        let subscription_type = root(roots.2, "Subscription");

        for root_name in [&query_type, &mutation_type, &subscription_type]
            .into_iter()
            .flatten()
        {
            if !types.contains_key(root_name) {
                return Err(SchemaParseError(format!(
                    "root type '{root_name}' is not defined"
                )));
            }
        }

        Ok(Self {
            types,
            query_type,
            mutation_type,
            subscription_type,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// All types in name order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Object types declaring that they implement `interface_name`, in name
    /// order. Interfaces extending it are not included.
    pub fn implementors(&self, interface_name: &str) -> Vec<&str> {
        self.types
            .values()
            .filter(|t| t.kind == TypeKind::Object)
            .filter(|t| t.interfaces.iter().any(|i| i == interface_name))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Member type names of a union; empty for anything else.
    pub fn union_members(&self, union_name: &str) -> Vec<&str> {
        self.lookup(union_name)
            .filter(|t| t.kind == TypeKind::Union)
            .map(|t| t.union_members.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn query_type(&self) -> Option<&TypeDefinition> {
        self.query_type.as_deref().and_then(|n| self.lookup(n))
    }

    pub fn mutation_type(&self) -> Option<&TypeDefinition> {
        self.mutation_type.as_deref().and_then(|n| self.lookup(n))
    }

    pub fn subscription_type(&self) -> Option<&TypeDefinition> {
        self.subscription_type.as_deref().and_then(|n| self.lookup(n))
    }

    pub fn query_fields(&self) -> &[FieldDefinition] {
        self.query_type().map(|t| t.fields.as_slice()).unwrap_or(&[])
    }

    pub fn mutation_fields(&self) -> &[FieldDefinition] {
        self.mutation_type()
            .map(|t| t.fields.as_slice())
            .unwrap_or(&[])
    }

    /// Field `field` of type `type_name`.
    pub fn field(&self, type_name: &str, field: &str) -> Option<&FieldDefinition> {
        self.lookup(type_name).and_then(|t| t.field(field))
    }
}

fn convert_type(def: SdlType<'_, String>) -> TypeDefinition {
    match def {
        SdlType::Scalar(s) => TypeDefinition::new(s.name, TypeKind::Scalar, s.description),
        SdlType::Object(o) => {
            let mut t = TypeDefinition::new(o.name, TypeKind::Object, o.description);
            t.interfaces = o.implements_interfaces;
            t.fields = o.fields.into_iter().map(FieldDefinition::from_sdl).collect();
            t
        }
        SdlType::Interface(i) => {
            let mut t = TypeDefinition::new(i.name, TypeKind::Interface, i.description);
            t.interfaces = i.implements_interfaces;
            t.fields = i.fields.into_iter().map(FieldDefinition::from_sdl).collect();
            t
        }
        SdlType::Union(u) => {
            let mut t = TypeDefinition::new(u.name, TypeKind::Union, u.description);
            t.union_members = u.types;
            t
        }
        SdlType::Enum(e) => {
            let mut t = TypeDefinition::new(e.name, TypeKind::Enum, e.description);
            t.enum_values = e
                .values
                .into_iter()
                .map(EnumValueDefinition::from_sdl)
                .collect();
            t
        }
        SdlType::InputObject(i) => {
            let mut t = TypeDefinition::new(i.name, TypeKind::InputObject, i.description);
            t.input_fields = i
                .fields
                .into_iter()
                .map(InputValueDefinition::from_sdl)
                .collect();
            t
        }
    }
}

fn apply_extension(
    types: &mut BTreeMap<String, TypeDefinition>,
    ext: TypeExtension<'_, String>,
) -> Result<(), SchemaParseError> {
    let (name, kind) = match &ext {
        TypeExtension::Scalar(e) => (e.name.clone(), TypeKind::Scalar),
        TypeExtension::Object(e) => (e.name.clone(), TypeKind::Object),
        TypeExtension::Interface(e) => (e.name.clone(), TypeKind::Interface),
        TypeExtension::Union(e) => (e.name.clone(), TypeKind::Union),
        TypeExtension::Enum(e) => (e.name.clone(), TypeKind::Enum),
        TypeExtension::InputObject(e) => (e.name.clone(), TypeKind::InputObject),
    };

    let target = types
        .get_mut(&name)
        .ok_or_else(|| SchemaParseError(format!("cannot extend undefined type '{name}'")))?;
    if target.kind != kind {
        return Err(SchemaParseError(format!(
            "cannot extend {} '{name}' as {kind}",
            target.kind
        )));
    }

    match ext {
        TypeExtension::Scalar(_) => {}
        TypeExtension::Object(e) => {
            target.interfaces.extend(e.implements_interfaces);
            target
                .fields
                .extend(e.fields.into_iter().map(FieldDefinition::from_sdl));
        }
        TypeExtension::Interface(e) => {
            target.interfaces.extend(e.implements_interfaces);
            target
                .fields
                .extend(e.fields.into_iter().map(FieldDefinition::from_sdl));
        }
        TypeExtension::Union(e) => target.union_members.extend(e.types),
        TypeExtension::Enum(e) => target
            .enum_values
            .extend(e.values.into_iter().map(EnumValueDefinition::from_sdl)),
        TypeExtension::InputObject(e) => target
            .input_fields
            .extend(e.fields.into_iter().map(InputValueDefinition::from_sdl)),
    }
    Ok(())
}

fn deprecation_reason(directives: &[Directive<'_, String>]) -> Option<String> {
    let directive = directives.iter().find(|d| d.name == "deprecated")?;
    let reason = directive
        .arguments
        .iter()
        .find(|(name, _)| name == "reason")
        .and_then(|(_, value)| match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        });
    Some(reason.unwrap_or_else(|| DEFAULT_DEPRECATION_REASON.to_string()))
}

/// Render a default value the way it appears in SDL.
fn format_value(value: &Value<'_, String>) -> String {
    match value {
        Value::Variable(name) => format!("${name}"),
        Value::Int(n) => n
            .as_i64()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "0".to_string()),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Enum(name) => name.clone(),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{k}: {}", format_value(v)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}
