//! Value representation shared by code and data

mod callable;
mod compound;
mod decimal;
mod display;
mod hashable;
mod impls;
mod symbol;

pub use callable::{Closure, FnArity, Function, NativeFn, NativeFnPtr};
pub use compound::{CustomInstance, Handle};
pub use decimal::Decimal;
pub use display::{CustomPrinter, Printer};
pub(crate) use impls::numeric_cmp;
pub use symbol::{Keyword, Symbol};

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::runtime::{AtomCell, FutureCell};

/// Map payload of [`Value::Map`] and of metadata.
pub type ValueMap = IndexMap<Value, Value>;

/// Set payload of [`Value::Set`].
pub type ValueSet = IndexSet<Value>;

/// Optional metadata map. Equality and hashing ignore it.
pub type Meta = Option<Arc<ValueMap>>;

/// Runtime value representation for the Thicket interpreter.
///
/// Values are organized into three tiers:
/// - Tier 1: Inline scalars (no allocation beyond interned names)
/// - Tier 2: Heap-allocated collections (Arc-wrapped, immutable)
/// - Tier 3: Callables and reference cells
///
/// Program text reads into this same type, so every AST node is a value.
#[derive(Clone)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Tier 1: Scalars
    // ═══════════════════════════════════════════════════════════════════
    /// The absence of a value
    Nil,

    /// Boolean: `true` or `false`
    Bool(bool),

    /// 64-bit signed integer (`long`)
    Integer(i64),

    /// 64-bit floating point (`double`)
    Float(f64),

    /// Exact decimal with scale, written `1.50M`
    Decimal(Decimal),

    /// Immutable string
    String(Arc<str>),

    /// Keyword: `:name` or `:ns/name`
    Keyword(Keyword),

    /// Symbol: `name` or `ns/name`
    Symbol(Symbol),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 2: Collections
    // ═══════════════════════════════════════════════════════════════════
    /// List `(a b c)`
    List(Arc<Vec<Value>>, Meta),

    /// Vector `[a b c]`
    Vector(Arc<Vec<Value>>, Meta),

    /// Map `{k v}`, insertion ordered
    Map(Arc<ValueMap>, Meta),

    /// Set `#{a b}`, insertion ordered
    Set(Arc<ValueSet>, Meta),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 3: Callables and references
    // ═══════════════════════════════════════════════════════════════════
    /// Native, closure, multimethod or protocol method
    Function(Function),

    /// Closure flagged for expansion instead of invocation
    Macro(Arc<Closure>),

    /// Mutable reference cell
    Atom(Arc<AtomCell>),

    /// Pending or completed asynchronous result
    Future(Arc<FutureCell>),

    /// Instance of a user-defined nominal type
    Custom(Arc<CustomInstance>),

    /// Opaque host object
    Handle(Handle),
}
