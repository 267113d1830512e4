//! Member lookup for host objects.
//!
//! Key paths never reflect over host objects. The compiler asks a [`MemberResolver`] for an
//! accessor once per `(shape, member)` pair: at compile time when the static type of the
//! object is known, otherwise at evaluation time using the runtime [`Object::shape`].

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};

use crate::{
    types::ValueType,
    value::{Object, Record, Value},
};

type Getter = Arc<dyn Fn(&dyn Object) -> Option<Value> + Send + Sync>;

/// Accessor for one member of one shape.
#[derive(Clone)]
pub struct Member {
    pub name: String,
    pub ty: ValueType,
    get: Getter,
}

impl Member {
    pub fn new(
        name: impl Into<String>,
        ty: ValueType,
        get: impl Fn(&dyn Object) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Member {
            name: name.into(),
            ty,
            get: Arc::new(get),
        }
    }

    /// Read the member. `None` means absent, which key paths treat like `nil`.
    pub fn get(&self, object: &dyn Object) -> Option<Value> {
        (self.get)(object)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

pub trait MemberResolver: Send + Sync {
    /// Accessor for `name` on objects of `shape`, or `None` if the shape has no such member.
    fn resolve(&self, shape: &str, name: &str) -> Option<Member>;
}

fn record_field(name: &str) -> impl Fn(&dyn Object) -> Option<Value> + Send + Sync + 'static {
    let name = name.to_string();
    move |object| {
        object
            .as_any()
            .downcast_ref::<Record>()
            .and_then(|record| record.field_ignore_case(&name))
            .cloned()
    }
}

/// Resolves any name on [`Record`]s, case-insensitively. Members are untyped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordResolver;

impl MemberResolver for RecordResolver {
    fn resolve(&self, _shape: &str, name: &str) -> Option<Member> {
        Some(Member::new(name, ValueType::Any, record_field(name)))
    }
}

/// Explicitly declared, typed members per shape.
///
/// Lookups prefer an exact name and fall back to ASCII case-insensitive matching. Shapes
/// that were never declared are delegated to the fallback resolver, if any.
///
/// ```
/// use predicate_lang::{resolve::{MemberResolver, SchemaResolver}, ValueType};
///
/// let schema = SchemaResolver::new()
///     .field("User", "Age", ValueType::I32)
///     .field("User", "Nickname", ValueType::String);
///
/// assert_eq!(schema.resolve("User", "age").map(|m| m.ty), Some(ValueType::I32));
/// assert!(schema.resolve("User", "Email").is_none());
/// ```
#[derive(Clone, Default)]
pub struct SchemaResolver {
    shapes: HashMap<String, Vec<Member>>,
    fallback: Option<Arc<dyn MemberResolver>>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        SchemaResolver::default()
    }

    /// Declare a member with a custom accessor.
    pub fn member(
        mut self,
        shape: impl Into<String>,
        name: impl Into<String>,
        ty: ValueType,
        get: impl Fn(&dyn Object) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.shapes
            .entry(shape.into())
            .or_default()
            .push(Member::new(name, ty, get));
        self
    }

    /// Declare a typed member read from a [`Record`] field of the same name.
    pub fn field(self, shape: impl Into<String>, name: impl Into<String>, ty: ValueType) -> Self {
        let name = name.into();
        let get = record_field(&name);
        self.member(shape, name, ty, get)
    }

    /// Resolver consulted for shapes this schema does not declare.
    pub fn with_fallback(mut self, fallback: Arc<dyn MemberResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl MemberResolver for SchemaResolver {
    fn resolve(&self, shape: &str, name: &str) -> Option<Member> {
        match self.shapes.get(shape) {
            Some(members) => members
                .iter()
                .find(|m| m.name == name)
                .or_else(|| members.iter().find(|m| m.name.eq_ignore_ascii_case(name)))
                .cloned(),
            None => self
                .fallback
                .as_ref()
                .and_then(|fallback| fallback.resolve(shape, name)),
        }
    }
}

/// Memoizes another resolver's answers per `(shape, name)`, including negative answers.
pub struct CachingResolver {
    inner: Arc<dyn MemberResolver>,
    cache: RwLock<HashMap<(String, String), Option<Member>>>,
}

impl CachingResolver {
    pub fn new(inner: Arc<dyn MemberResolver>) -> Self {
        CachingResolver {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached `(shape, name)` pairs.
    pub fn len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MemberResolver for CachingResolver {
    fn resolve(&self, shape: &str, name: &str) -> Option<Member> {
        let key = (shape.to_string(), name.to_string());
        if let Ok(cache) = self.cache.read()
            && let Some(hit) = cache.get(&key)
        {
            return hit.clone();
        }

        tracing::trace!(shape, name, "member cache miss");
        let member = self.inner.resolve(shape, name);
        // A poisoned cache only costs repeated lookups.
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, member.clone());
        }
        member
    }
}

impl fmt::Debug for CachingResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingResolver")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}
