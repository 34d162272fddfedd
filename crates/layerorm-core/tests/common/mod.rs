#![allow(dead_code)]

use std::sync::Arc;

use layerorm_core::row::BindTable;
use layerorm_core::{
    Bindable, FieldKind, LayerContext, LayerSchema, MemorySession, ModelLayer, Registry,
    RelationKind, RelationSpec, Value,
};

macro_rules! fixture_layer {
    ($name:ident, $declare:expr) => {
        #[derive(Default)]
        pub struct $name {
            context: LayerContext,
        }

        impl ModelLayer for $name {
            fn layer_schema(&self) -> LayerSchema {
                $declare
            }

            fn context(&self) -> &LayerContext {
                &self.context
            }

            fn context_mut(&mut self) -> &mut LayerContext {
                &mut self.context
            }
        }
    };
}

// ===== Two implementations of one model =====

fixture_layer!(
    UserBase,
    LayerSchema::new("user")
        .table("users")
        .field("id", FieldKind::Integer)
        .field("name", FieldKind::Text)
        .primary_key("id")
        .default_value("state", "draft")
        .method("greet", |_, _| Ok(Value::from("hello from base")))
);

fixture_layer!(
    UserEu,
    LayerSchema::new("user")
        .field("extra", FieldKind::Text)
        .primary_key("tenant")
        .default_value("state", "active")
        .default_value("locale", "de")
        .method("greet", |_, _| Ok(Value::from("hello from eu")))
        .method("describe", |layer, args| {
            let suffix = args.first().map(Value::to_text).unwrap_or_default();
            Ok(Value::from(format!("{}@{}{}", layer.name(), layer.region(), suffix)))
        })
);

// ===== Inheritance chain a -> b -> c =====

fixture_layer!(
    ChainC,
    LayerSchema::new("c")
        .table("c_table")
        .field("c_id", FieldKind::Integer)
        .field("c_only", FieldKind::Text)
);

fixture_layer!(
    ChainB,
    LayerSchema::new("b")
        .table("b_table")
        .field("b_id", FieldKind::Integer)
        .field("c_id", FieldKind::Integer)
        .field("b_only", FieldKind::Text)
        .inherits("c", "c_id")
);

fixture_layer!(
    ChainA,
    LayerSchema::new("a")
        .table("a_table")
        .field("a_id", FieldKind::Integer)
        .field("a_only", FieldKind::Text)
        .relation(
            "b_id",
            RelationKind::ManyToOne,
            RelationSpec::new("b", "b_id", "b_id")
        )
);

// ===== Cyclic pair x <-> y =====

fixture_layer!(
    CycleX,
    LayerSchema::new("x")
        .field("x_id", FieldKind::Integer)
        .field("x_only", FieldKind::Text)
        .inherits("y", "y_id")
);

fixture_layer!(
    CycleY,
    LayerSchema::new("y")
        .field("y_id", FieldKind::Integer)
        .field("y_only", FieldKind::Text)
        .inherits("x", "x_id")
);

// ===== Orders domain for CRUD and relation fetches =====

fixture_layer!(
    Customer,
    LayerSchema::new("customer")
        .table("customers")
        .field("id", FieldKind::Integer)
        .field("name", FieldKind::Text)
        .primary_key("id")
);

fixture_layer!(
    Order,
    LayerSchema::new("order")
        .table("orders")
        .field("id", FieldKind::Integer)
        .field("customer_id", FieldKind::Integer)
        .field("total", FieldKind::Float)
        .field("status", FieldKind::Text)
        .field("created_at", FieldKind::Timestamp)
        .field("updated_at", FieldKind::Timestamp)
        .field("deleted_at", FieldKind::Timestamp)
        .primary_key("id")
        .created("created_at")
        .updated("updated_at")
        .deleted("deleted_at")
        .default_value("status", "open")
        .relation(
            "customer",
            RelationKind::ManyToOne,
            RelationSpec::new("customer", "customer_id", "id")
        )
        .relation(
            "lines",
            RelationKind::OneToMany,
            RelationSpec::new("order_line", "id", "order_id")
        )
        .relation(
            "tags",
            RelationKind::ManyToMany,
            RelationSpec::new("tag", "id", "id").through("order_tag", "order_id", "tag_id")
        )
        .relation(
            "tags_unlinked",
            RelationKind::ManyToMany,
            RelationSpec::new("tag", "id", "id")
        )
        .relation(
            "owner",
            RelationKind::Other("polymorphic".to_string()),
            RelationSpec::new("customer", "customer_id", "id")
        )
);

fixture_layer!(
    OrderLine,
    LayerSchema::new("order_line")
        .table("order_lines")
        .field("id", FieldKind::Integer)
        .field("order_id", FieldKind::Integer)
        .field("sku", FieldKind::Text)
);

fixture_layer!(
    Tag,
    LayerSchema::new("tag")
        .table("tags")
        .field("id", FieldKind::Integer)
        .field("label", FieldKind::Text)
);

fixture_layer!(
    OrderTag,
    LayerSchema::new("order_tag")
        .table("order_tags")
        .field("order_id", FieldKind::Integer)
        .field("tag_id", FieldKind::Integer)
);

/// Registry with both user implementations: base in the default region, eu in "eu"
pub fn user_registry() -> Registry {
    let registry = Registry::default();
    registry.register_layer::<UserBase>("").unwrap();
    registry.register_layer::<UserEu>("eu").unwrap();
    registry
}

/// Registry with the a -> b -> c chain
pub fn chain_registry() -> Registry {
    let registry = Registry::default();
    registry.register_layer::<ChainC>("").unwrap();
    registry.register_layer::<ChainB>("").unwrap();
    registry.register_layer::<ChainA>("").unwrap();
    registry
}

/// Registry with the orders domain
pub fn orders_registry() -> Registry {
    let registry = Registry::default();
    registry.register_layer::<Customer>("").unwrap();
    registry.register_layer::<Order>("").unwrap();
    registry.register_layer::<OrderLine>("").unwrap();
    registry.register_layer::<Tag>("").unwrap();
    registry.register_layer::<OrderTag>("").unwrap();
    registry
}

/// An order layer bound to a fresh in-memory session
pub fn order_layer(registry: &Registry) -> (Box<dyn ModelLayer>, Arc<MemorySession>) {
    let session = Arc::new(MemorySession::new());
    let mut layer = registry.get_model("order", None).unwrap();
    layer.attach_session(session.clone());
    (layer, session)
}

/// Raw record from field/value pairs
pub fn record<const N: usize>(fields: [(&str, Value); N]) -> layerorm_core::RawRecord {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

// ===== Struct binding target =====

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Account {
    pub user_name: String,
    pub age: i64,
    pub score: f64,
    pub active: bool,
    pub joined: Option<chrono::DateTime<chrono::Utc>>,
    pub payload: Value,
}

impl Bindable for Account {
    fn bind_table() -> BindTable<Self> {
        BindTable::<Self>::new()
            .text("user_name", |a, v| a.user_name = v)
            .integer("age", |a, v| a.age = v)
            .float("score", |a, v| a.score = v)
            .boolean("active", |a, v| a.active = v)
            .timestamp("joined", |a, v| a.joined = Some(v))
            .generic("payload", |a, v| a.payload = v)
    }
}
