use std::fmt;

/// Statically inferred type of an expression.
///
/// `Primitive` and `Any` are "fuzzy": checks against them are deferred to
/// evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    String,
    Number,
    Boolean,
    Null,
    RegExp,
    /// One of string, number, boolean or null.
    Primitive,
    Any,
    Snapshot,
    Array(Box<Type>),
    Function(Method),
}

impl Type {
    #[must_use]
    pub fn is_fuzzy(&self) -> bool {
        matches!(self, Type::Primitive | Type::Any)
    }

    /// String, number, boolean, null or `Primitive`.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::String | Type::Number | Type::Boolean | Type::Null | Type::Primitive
        )
    }

    /// Whether a value of type `actual` may be used where `self` is required.
    #[must_use]
    pub fn accepts(&self, actual: &Type) -> bool {
        self == actual || actual.is_fuzzy()
    }

    /// Least common supertype of two branch types.
    #[must_use]
    pub fn join(&self, other: &Type) -> Type {
        if self == other {
            self.clone()
        } else if self.is_primitive() && other.is_primitive() {
            Type::Primitive
        } else {
            Type::Any
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::String => write!(f, "string"),
            Type::Number => write!(f, "number"),
            Type::Boolean => write!(f, "boolean"),
            Type::Null => write!(f, "null"),
            Type::RegExp => write!(f, "RegExp"),
            Type::Primitive => write!(f, "primitive"),
            Type::Any => write!(f, "any"),
            Type::Snapshot => write!(f, "Snapshot"),
            Type::Array(item) => write!(f, "{item}[]"),
            Type::Function(method) => write!(f, "{method}"),
        }
    }
}

/// Built-in methods available on snapshots and strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Val,
    Child,
    Parent,
    HasChild,
    HasChildren,
    Exists,
    GetPriority,
    IsNumber,
    IsString,
    IsBoolean,
    Contains,
    BeginsWith,
    EndsWith,
    Replace,
    ToLowerCase,
    ToUpperCase,
    Matches,
}

impl Method {
    /// Look up a snapshot method by its rule-language name.
    #[must_use]
    pub fn snapshot(name: &str) -> Option<Method> {
        Some(match name {
            "val" => Method::Val,
            "child" => Method::Child,
            "parent" => Method::Parent,
            "hasChild" => Method::HasChild,
            "hasChildren" => Method::HasChildren,
            "exists" => Method::Exists,
            "getPriority" => Method::GetPriority,
            "isNumber" => Method::IsNumber,
            "isString" => Method::IsString,
            "isBoolean" => Method::IsBoolean,
            _ => return None,
        })
    }

    /// Look up a string method by its rule-language name.
    #[must_use]
    pub fn string(name: &str) -> Option<Method> {
        Some(match name {
            "contains" => Method::Contains,
            "beginsWith" => Method::BeginsWith,
            "endsWith" => Method::EndsWith,
            "replace" => Method::Replace,
            "toLowerCase" => Method::ToLowerCase,
            "toUpperCase" => Method::ToUpperCase,
            "matches" => Method::Matches,
            _ => return None,
        })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Method::Val => "val",
            Method::Child => "child",
            Method::Parent => "parent",
            Method::HasChild => "hasChild",
            Method::HasChildren => "hasChildren",
            Method::Exists => "exists",
            Method::GetPriority => "getPriority",
            Method::IsNumber => "isNumber",
            Method::IsString => "isString",
            Method::IsBoolean => "isBoolean",
            Method::Contains => "contains",
            Method::BeginsWith => "beginsWith",
            Method::EndsWith => "endsWith",
            Method::Replace => "replace",
            Method::ToLowerCase => "toLowerCase",
            Method::ToUpperCase => "toUpperCase",
            Method::Matches => "matches",
        }
    }

    /// Fixed parameter types. `hasChildren` is checked separately: it takes
    /// either nothing or a non-empty array of strings.
    #[must_use]
    pub fn params(self) -> Vec<Type> {
        match self {
            Method::Child
            | Method::HasChild
            | Method::Contains
            | Method::BeginsWith
            | Method::EndsWith => vec![Type::String],
            Method::Replace => vec![Type::String, Type::String],
            Method::Matches => vec![Type::RegExp],
            Method::HasChildren => vec![Type::Array(Box::new(Type::String))],
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn returns(self) -> Type {
        match self {
            Method::Val | Method::GetPriority => Type::Primitive,
            Method::Child | Method::Parent => Type::Snapshot,
            Method::Replace | Method::ToLowerCase | Method::ToUpperCase => Type::String,
            _ => Type::Boolean,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params().iter().map(ToString::to_string).collect();
        write!(f, "{}({}) -> {}", self.name(), params.join(", "), self.returns())
    }
}
