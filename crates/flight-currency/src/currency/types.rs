//! Data structures for currency definitions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Currency id
// ---------------------------------------------------------------------------

/// Stable identifier for a currency, shared by primitives and composites.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyId(pub String);

impl CurrencyId {
    /// Create a new currency id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Rules and policies
// ---------------------------------------------------------------------------

/// How a primitive turns event history into an expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryRule {
    /// Most recent qualifying event plus the validity period.
    LastEventPlusPeriod,
    /// Enough qualifying events inside the trailing validity window.
    RollingWindow,
}

/// How a composite combines the expiry dates of its satisfied leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryCalculation {
    EarliestChild,
    LatestChild,
}

/// Boolean operator of a logic group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOperator {
    And,
    Or,
}

impl std::fmt::Display for LogicOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicOperator::And => write!(f, "AND"),
            LogicOperator::Or => write!(f, "OR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logic tree
// ---------------------------------------------------------------------------

/// One element of a logic group: a reference to another currency or a nested group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicChild {
    Reference(CurrencyId),
    Group(LogicNode),
}

impl LogicChild {
    pub fn reference(id: impl Into<String>) -> Self {
        LogicChild::Reference(CurrencyId::new(id))
    }
}

/// An AND/OR group. An empty group is never satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicNode {
    pub operator: LogicOperator,
    #[serde(default)]
    pub children: Vec<LogicChild>,
}

impl LogicNode {
    /// Create an empty group.
    pub fn new(operator: LogicOperator) -> Self {
        Self {
            operator,
            children: Vec::new(),
        }
    }

    /// AND group over plain references.
    pub fn all_of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_references(LogicOperator::And, ids)
    }

    /// OR group over plain references.
    pub fn any_of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_references(LogicOperator::Or, ids)
    }

    fn with_references<I, S>(operator: LogicOperator, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operator,
            children: ids.into_iter().map(LogicChild::reference).collect(),
        }
    }

    /// Append a reference leaf.
    pub fn reference(mut self, id: impl Into<String>) -> Self {
        self.children.push(LogicChild::reference(id));
        self
    }

    /// Append a nested group.
    pub fn group(mut self, node: LogicNode) -> Self {
        self.children.push(LogicChild::Group(node));
        self
    }

    /// Every reference leaf in the tree, in document order, duplicates kept.
    ///
    /// Walks with an explicit stack so arbitrarily deep trees are safe.
    pub fn references(&self) -> Vec<&CurrencyId> {
        let mut refs = Vec::new();
        let mut stack: Vec<&LogicChild> = self.children.iter().rev().collect();

        while let Some(child) = stack.pop() {
            match child {
                LogicChild::Reference(id) => refs.push(id),
                LogicChild::Group(node) => stack.extend(node.children.iter().rev()),
            }
        }
        refs
    }

    /// Distinct referenced ids.
    pub fn referenced_ids(&self) -> BTreeSet<CurrencyId> {
        self.references().into_iter().cloned().collect()
    }

    /// Total node count (this group, nested groups, and reference leaves).
    pub fn node_count(&self) -> usize {
        let mut count = 1;
        let mut stack: Vec<&LogicNode> = vec![self];
        while let Some(node) = stack.pop() {
            for child in &node.children {
                count += 1;
                if let LogicChild::Group(inner) = child {
                    stack.push(inner);
                }
            }
        }
        count
    }

    /// Count of groups (including this one) with no children.
    pub fn empty_group_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&LogicNode> = vec![self];
        while let Some(node) = stack.pop() {
            if node.children.is_empty() {
                count += 1;
            }
            for child in &node.children {
                if let LogicChild::Group(inner) = child {
                    stack.push(inner);
                }
            }
        }
        count
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A currency derived directly from a person's dated events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveCurrency {
    pub id: CurrencyId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default)]
    pub event_codes: BTreeSet<String>,
    pub required_count: u32,
    pub validity_days: u32,
    pub expiry_rule: ExpiryRule,
}

impl PrimitiveCurrency {
    /// New visible primitive: one event, last event plus `validity_days`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, validity_days: u32) -> Self {
        Self {
            id: CurrencyId::new(id),
            name: name.into(),
            description: String::new(),
            is_visible: true,
            event_codes: BTreeSet::new(),
            required_count: 1,
            validity_days,
            expiry_rule: ExpiryRule::LastEventPlusPeriod,
        }
    }

    pub fn event_code(mut self, code: impl Into<String>) -> Self {
        self.event_codes.insert(code.into());
        self
    }

    pub fn required_count(mut self, count: u32) -> Self {
        self.required_count = count;
        self
    }

    pub fn rule(mut self, rule: ExpiryRule) -> Self {
        self.expiry_rule = rule;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    /// Whether `code` qualifies for this currency.
    pub fn matches(&self, code: &str) -> bool {
        self.event_codes.contains(code)
    }
}

/// A currency defined as an AND/OR combination of other currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeCurrency {
    pub id: CurrencyId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    pub logic_tree: LogicNode,
    pub expiry_calculation: ExpiryCalculation,
}

impl CompositeCurrency {
    /// New visible composite aggregating with `EarliestChild`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, logic_tree: LogicNode) -> Self {
        Self {
            id: CurrencyId::new(id),
            name: name.into(),
            description: String::new(),
            is_visible: true,
            logic_tree,
            expiry_calculation: ExpiryCalculation::EarliestChild,
        }
    }

    pub fn calculation(mut self, calculation: ExpiryCalculation) -> Self {
        self.expiry_calculation = calculation;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }
}

fn default_visible() -> bool {
    true
}

/// Discriminant of a [`CurrencyDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyKind {
    Primitive,
    Composite,
}

impl std::fmt::Display for CurrencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurrencyKind::Primitive => write!(f, "primitive"),
            CurrencyKind::Composite => write!(f, "composite"),
        }
    }
}

/// A currency definition: primitive or composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurrencyDefinition {
    Primitive(PrimitiveCurrency),
    Composite(CompositeCurrency),
}

impl CurrencyDefinition {
    pub fn id(&self) -> &CurrencyId {
        match self {
            CurrencyDefinition::Primitive(p) => &p.id,
            CurrencyDefinition::Composite(c) => &c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CurrencyDefinition::Primitive(p) => &p.name,
            CurrencyDefinition::Composite(c) => &c.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CurrencyDefinition::Primitive(p) => &p.description,
            CurrencyDefinition::Composite(c) => &c.description,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            CurrencyDefinition::Primitive(p) => p.is_visible,
            CurrencyDefinition::Composite(c) => c.is_visible,
        }
    }

    pub fn kind(&self) -> CurrencyKind {
        match self {
            CurrencyDefinition::Primitive(_) => CurrencyKind::Primitive,
            CurrencyDefinition::Composite(_) => CurrencyKind::Composite,
        }
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveCurrency> {
        match self {
            CurrencyDefinition::Primitive(p) => Some(p),
            CurrencyDefinition::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeCurrency> {
        match self {
            CurrencyDefinition::Composite(c) => Some(c),
            CurrencyDefinition::Primitive(_) => None,
        }
    }
}

impl From<PrimitiveCurrency> for CurrencyDefinition {
    fn from(p: PrimitiveCurrency) -> Self {
        CurrencyDefinition::Primitive(p)
    }
}

impl From<CompositeCurrency> for CurrencyDefinition {
    fn from(c: CompositeCurrency) -> Self {
        CurrencyDefinition::Composite(c)
    }
}
