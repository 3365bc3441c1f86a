use crate::task::TaskId;

/// Fields editable through `maniphest.edit`. Each entry maps to one
/// transaction type on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Priority,
    Status,
    Owner,
    Column,
    Comment,
    ProjectsAdd,
    ParentsSet,
    SubscribersSet,
    SubscribersAdd,
}

impl Field {
    pub fn wire_name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Priority => "priority",
            Field::Status => "status",
            Field::Owner => "owner",
            Field::Column => "column",
            Field::Comment => "comment",
            Field::ProjectsAdd => "projects.add",
            Field::ParentsSet => "parents.set",
            Field::SubscribersSet => "subscribers.set",
            Field::SubscribersAdd => "subscribers.add",
        }
    }
}

/// A transaction value is either a single value or an ordered list. List
/// shapes carry "add/set N items" semantics and are encoded positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Ordered set of transactions for one `maniphest.edit` call. Insertion
/// order is preserved on the wire because the server applies transactions
/// sequentially.
#[derive(Debug, Clone, Default)]
pub struct TransactionSet {
    entries: Vec<(Field, FieldValue)>,
}

impl TransactionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: Field, value: impl Into<FieldValue>) {
        self.entries.push((field, value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as Conduit form parameters. With an object identifier the
    /// payload edits an existing task; without one the same payload is a
    /// creation request.
    pub fn encode(&self, object: Option<&TaskId>) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(id) = object {
            params.push(("objectIdentifier".to_string(), id.to_string()));
        }
        for (slot, (field, value)) in self.entries.iter().enumerate() {
            params.push((
                format!("transactions[{slot}][type]"),
                field.wire_name().to_string(),
            ));
            match value {
                FieldValue::Scalar(scalar) => {
                    params.push((format!("transactions[{slot}][value]"), scalar.clone()));
                }
                FieldValue::List(values) => {
                    for (index, item) in values.iter().enumerate() {
                        params.push((
                            format!("transactions[{slot}][value][{index}]"),
                            item.clone(),
                        ));
                    }
                }
            }
        }
        params
    }
}
