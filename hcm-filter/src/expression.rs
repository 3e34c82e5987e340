use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::operator::OpType;

/// How the rules of one expression level are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogicOperator {
    #[default]
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
}

impl LogicOperator {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            LogicOperator::And => " AND ",
            LogicOperator::Or => " OR ",
        }
    }
}

/// Leaf predicate: `field <op> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomRule {
    pub field: String,
    pub op: OpType,
    pub value: Value,
}

/// A boolean combination of rules. Decodes from
/// `{"op": "and", "rules": [{"field": "id", "op": "in", "value": ["7", "8"]}]}`.
///
/// The top-level expression may be empty (`{}`), which selects every row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Expression {
    #[serde(default)]
    pub op: LogicOperator,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Either a leaf or a nested expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Atom(AtomRule),
    Expr(Expression),
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rule::Atom(atom) => atom.serialize(serializer),
            Rule::Expr(expr) => expr.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Rule {
    /// An object carrying `field` is an atom; anything else is an expression.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let is_atom = raw.as_object().map(|o| o.contains_key("field"));
        match is_atom {
            None => Err(de::Error::custom("filter rule must be an object")),
            Some(true) => AtomRule::deserialize(raw).map(Rule::Atom).map_err(de::Error::custom),
            Some(false) => Expression::deserialize(raw).map(Rule::Expr).map_err(de::Error::custom),
        }
    }
}

impl From<AtomRule> for Rule {
    fn from(atom: AtomRule) -> Self {
        Rule::Atom(atom)
    }
}

impl From<Expression> for Rule {
    fn from(expr: Expression) -> Self {
        Rule::Expr(expr)
    }
}

macro_rules! atom_ctor {
    ($($name:ident => $op:ident),+ $(,)?) => {
        $(
            pub fn $name(field: impl Into<String>, value: impl Into<Value>) -> Self {
                Self::new(field, OpType::$op, value)
            }
        )+
    };
}

impl AtomRule {
    pub fn new(field: impl Into<String>, op: OpType, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    atom_ctor! {
        eq => Equal,
        neq => NotEqual,
        gt => GreaterThan,
        gte => GreaterThanEqual,
        lt => LessThan,
        lte => LessThanEqual,
        in_ => In,
        nin => NotIn,
        cs => ContainsSensitive,
        cis => ContainsInsensitive,
        json_eq => JsonEqual,
        json_neq => JsonNotEqual,
        json_in => JsonIn,
        json_contains => JsonContains,
        json_overlaps => JsonOverlaps,
        json_length => JsonLength,
    }

    pub fn id_gt(value: impl Into<Value>) -> Self {
        Self::new("id", OpType::IdGreaterThan, value)
    }
}

impl Expression {
    /// The empty expression; selects every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn and<I, R>(rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        Self {
            op: LogicOperator::And,
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn or<I, R>(rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        Self {
            op: LogicOperator::Or,
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }

    /// `field = value`.
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::and([AtomRule::eq(field, value)])
    }

    /// `field IN (values)`.
    pub fn contains_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::and([AtomRule::in_(field, values)])
    }

    /// `id IN (ids)`.
    pub fn in_ids<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Self::contains_in("id", ids.into_iter().map(|id| Value::String(id.into())))
    }

    /// Conjunction of `self` and `other`. Empty sides are dropped so
    /// merging with [`Expression::all`] is the identity.
    pub fn and_merge(self, other: Expression) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other,
            (_, true) => self,
            _ if self.op == LogicOperator::And && other.op == LogicOperator::And => {
                let mut rules = self.rules;
                rules.extend(other.rules);
                Self::and(rules)
            }
            _ => Self::and([Rule::Expr(self), Rule::Expr(other)]),
        }
    }

    pub fn push(&mut self, rule: impl Into<Rule>) {
        self.rules.push(rule.into());
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All atom fields referenced anywhere in the tree.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        for rule in &self.rules {
            match rule {
                Rule::Atom(atom) => out.push(atom.field.as_str()),
                Rule::Expr(expr) => expr.collect_fields(out),
            }
        }
    }
}
