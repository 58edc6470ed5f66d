//! Operation descriptors
//!
//! The router never sees SDK request types. Each request shape is adapted
//! to [`RoutableOperation`], which exposes just what routing needs: the
//! table, the kind of operation, and whichever key-bearing arguments the
//! request carries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::key::{KeySchemaElement, KeyValues};

/// Kind of an outgoing call, as far as routing is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    CreateTable,
    GetItem,
    PutItem,
    UpdateItem,
    DeleteItem,
    ConditionalPutItem,
    ConditionalUpdateItem,
    ConditionalDeleteItem,
    /// Anything else (scans, queries, batch calls, table admin)
    Other,
}

impl OperationKind {
    /// Item write of any kind
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            OperationKind::PutItem
                | OperationKind::UpdateItem
                | OperationKind::DeleteItem
                | OperationKind::ConditionalPutItem
                | OperationKind::ConditionalUpdateItem
                | OperationKind::ConditionalDeleteItem
        )
    }

    /// Conditional write that needs a consensus round on the server
    pub fn is_read_modify_write(&self) -> bool {
        matches!(
            self,
            OperationKind::ConditionalPutItem
                | OperationKind::ConditionalUpdateItem
                | OperationKind::ConditionalDeleteItem
        )
    }

    /// Conditional variant of a plain item write; other kinds are returned as is
    pub fn conditional(self) -> Self {
        match self {
            OperationKind::PutItem => OperationKind::ConditionalPutItem,
            OperationKind::UpdateItem => OperationKind::ConditionalUpdateItem,
            OperationKind::DeleteItem => OperationKind::ConditionalDeleteItem,
            other => other,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the router needs to know about a request
pub trait RoutableOperation {
    /// Target table
    fn table_name(&self) -> &str;

    /// Operation kind
    fn operation_kind(&self) -> OperationKind;

    /// Explicit key argument (get/update/delete)
    fn key_attributes(&self) -> Option<&KeyValues>;

    /// Full item payload (put); key attributes are not distinguishable here
    fn item(&self) -> Option<&KeyValues> {
        None
    }

    /// Key schema (create-table)
    fn key_schema(&self) -> Option<&[KeySchemaElement]> {
        None
    }
}

/// Owned operation descriptor, the default adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub table: String,
    pub kind: OperationKind,
    pub key: Option<KeyValues>,
    pub item: Option<KeyValues>,
    pub key_schema: Option<Vec<KeySchemaElement>>,
}

impl Operation {
    fn bare(table: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            table: table.into(),
            kind,
            key: None,
            item: None,
            key_schema: None,
        }
    }

    pub fn create_table(table: impl Into<String>, key_schema: Vec<KeySchemaElement>) -> Self {
        let mut op = Self::bare(table, OperationKind::CreateTable);
        op.key_schema = Some(key_schema);
        op
    }

    pub fn get_item(table: impl Into<String>, key: KeyValues) -> Self {
        let mut op = Self::bare(table, OperationKind::GetItem);
        op.key = Some(key);
        op
    }

    pub fn put_item(table: impl Into<String>, item: KeyValues) -> Self {
        let mut op = Self::bare(table, OperationKind::PutItem);
        op.item = Some(item);
        op
    }

    pub fn update_item(table: impl Into<String>, key: KeyValues) -> Self {
        let mut op = Self::bare(table, OperationKind::UpdateItem);
        op.key = Some(key);
        op
    }

    pub fn delete_item(table: impl Into<String>, key: KeyValues) -> Self {
        let mut op = Self::bare(table, OperationKind::DeleteItem);
        op.key = Some(key);
        op
    }

    /// Any other call against `table`; never key-routed
    pub fn other(table: impl Into<String>) -> Self {
        Self::bare(table, OperationKind::Other)
    }

    /// Mark a put/update/delete as conditional
    pub fn conditional(mut self) -> Self {
        self.kind = self.kind.conditional();
        self
    }
}

impl RoutableOperation for Operation {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn operation_kind(&self) -> OperationKind {
        self.kind
    }

    fn key_attributes(&self) -> Option<&KeyValues> {
        self.key.as_ref()
    }

    fn item(&self) -> Option<&KeyValues> {
        self.item.as_ref()
    }

    fn key_schema(&self) -> Option<&[KeySchemaElement]> {
        self.key_schema.as_deref()
    }
}
