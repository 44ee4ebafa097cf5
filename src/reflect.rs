//! Member introspection for application types.
//!
//! Rust has no runtime reflection, so a type opts in by listing its readable
//! members once through [Reflect]. The list is turned into a lookup table the
//! first time the type is seen and shared by every later lookup, whichever
//! thread performs it.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, OnceLock, PoisonError, RwLock},
};
use tracing::trace;
use crate::Value;


/// A readable member of `T`: its name and how to read it.
pub struct Member<T> {
    name: &'static str,
    get: fn(&T) -> Value,
}

impl<T> Member<T> {
    pub fn new(name: &'static str, get: fn(&T) -> Value) -> Self {
        Member { name, get }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Implemented by application types rendered through [Value::object].
///
/// ```
/// use stache::{Member, Reflect, Value};
///
/// struct Order { id: u32, total: f64 }
///
/// impl Reflect for Order {
///     fn members() -> Vec<Member<Self>> {
///         vec![
///             Member::new("id", |o| Value::from(o.id)),
///             Member::new("total", |o| Value::from(o.total)),
///         ]
///     }
/// }
///
/// let order = Value::object(Order { id: 7, total: 9.5 });
/// assert_eq!(order.member("id"), Some(Value::Int(7)));
/// ```
pub trait Reflect: Send + Sync + 'static {
    fn members() -> Vec<Member<Self>>
    where
        Self: Sized;
}

/// Object-safe view of a [Reflect] value, stored inside [Value::Object].
pub trait Reflected: Send + Sync {
    fn member(&self, name: &str) -> Option<Value>;
    fn members(&self) -> Vec<(String, Value)>;
    fn type_name(&self) -> &'static str;
}

impl<T: Reflect> Reflected for T {
    fn member(&self, name: &str) -> Option<Value> {
        let table = member_table::<T>();
        table.index.get(name).map(|&i| (table.members[i].get)(self))
    }

    fn members(&self) -> Vec<(String, Value)> {
        member_table::<T>().members
            .iter()
            .map(|member| (member.name.to_owned(), (member.get)(self)))
            .collect()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}


struct MemberTable<T> {
    members: Vec<Member<T>>,
    index: HashMap<&'static str, usize>,
}

impl<T: Reflect> MemberTable<T> {
    fn build() -> Self {
        let members = T::members();
        let index = members.iter()
            .enumerate()
            .map(|(i, member)| (member.name, i))
            .collect();
        MemberTable { members, index }
    }
}

type TableCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn cache() -> &'static TableCache {
    static CACHE: OnceLock<TableCache> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

fn member_table<T: Reflect>() -> Arc<MemberTable<T>> {
    let id = TypeId::of::<T>();
    let cached = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned();
    let table = match cached {
        Some(table) => table,
        None => {
            let mut tables = cache().write().unwrap_or_else(PoisonError::into_inner);
            tables.entry(id)
                .or_insert_with(|| {
                    trace!(type_name = std::any::type_name::<T>(), "building member table");
                    let table: Arc<dyn Any + Send + Sync> = Arc::new(MemberTable::<T>::build());
                    table
                })
                .clone()
        }
    };
    match table.downcast::<MemberTable<T>>() {
        Ok(table) => table,
        // entries are keyed by the TypeId of the table they hold
        Err(_) => Arc::new(MemberTable::<T>::build()),
    }
}
