/// Prefix shared by every element id handed to a [`GeometrySource`](crate::geometry::GeometrySource).
pub const TABLE_ID_PREFIX: &str = "table";

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub attributes: Vec<TableAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableAttribute {
    pub name: String,
    pub optional: bool,
    /// Parenthesized modifiers, in declaration order (`id(PK,UNIQUE)`).
    pub flags: Vec<String>,
    /// Key/value pairs from the trailing annotation, in declaration order.
    pub extra: Vec<Extra>,
    pub kind: AttributeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    Typed { ty: String },
    Reference { table: String, attribute: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extra {
    pub key: String,
    pub value: String,
}

impl TableSchema {
    pub fn element_id(&self) -> String {
        table_element_id(&self.name)
    }

    /// Reference attributes in declaration order, paired with their target.
    pub fn references(&self) -> impl Iterator<Item = (&TableAttribute, &str, &str)> {
        self.attributes.iter().filter_map(|a| match &a.kind {
            AttributeKind::Reference { table, attribute } => {
                Some((a, table.as_str(), attribute.as_str()))
            }
            AttributeKind::Typed { .. } => None,
        })
    }
}

impl TableAttribute {
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, AttributeKind::Reference { .. })
    }

    /// Right-hand column of an attribute row: the type, or `Table.attr` for references.
    pub fn target_label(&self) -> String {
        match &self.kind {
            AttributeKind::Typed { ty } => ty.clone(),
            AttributeKind::Reference { table, attribute } => format!("{}.{}", table, attribute),
        }
    }
}

pub fn table_element_id(table: &str) -> String {
    format!("{}.{}", TABLE_ID_PREFIX, table)
}

pub fn attribute_element_id(table: &str, attribute: &str) -> String {
    format!("{}.{}.{}", TABLE_ID_PREFIX, table, attribute)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str, kind: AttributeKind) -> TableAttribute {
        TableAttribute {
            name: name.into(),
            optional: false,
            flags: vec![],
            extra: vec![],
            kind,
        }
    }

    #[test]
    fn test_element_ids() {
        assert_eq!(table_element_id("User"), "table.User");
        assert_eq!(attribute_element_id("User", "id"), "table.User.id");
        assert_eq!(attribute_element_id("ユーザー", "名前"), "table.ユーザー.名前");
    }

    #[test]
    fn test_references_filter() {
        let schema = TableSchema {
            name: "UserAuth".into(),
            attributes: vec![
                attr("id", AttributeKind::Typed { ty: "number".into() }),
                attr(
                    "userId",
                    AttributeKind::Reference {
                        table: "User".into(),
                        attribute: "id".into(),
                    },
                ),
            ],
        };

        let refs: Vec<_> = schema
            .references()
            .map(|(a, t, c)| (a.name.as_str(), t, c))
            .collect();
        assert_eq!(refs, vec![("userId", "User", "id")]);
        assert_eq!(schema.attributes[1].target_label(), "User.id");
        assert_eq!(schema.element_id(), "table.UserAuth");
        assert!(!schema.attributes[0].is_reference());
    }
}
