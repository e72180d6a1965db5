//! The abstract syntax tree handed from the external parser to the generator.
//!
//! The node model is closed: [`NodeKind`] lists every construct the
//! generator understands and decoding any other `type` tag fails. Nodes are
//! exchanged as JSON objects whose `type` field names the kind, with the
//! [`NodeInfo`] fields flattened alongside the kind's own fields:
//!
//! ```
//! # use kotoba_core::ast::{Node, NodeKind};
//! let node = Node::from_json(r#"{"type": "word", "value": "A", "line": 3}"#).unwrap();
//! assert!(matches!(node.kind, NodeKind::Word { .. }));
//! assert_eq!(node.info.line, Some(3));
//! ```

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Parameter and particle metadata of a user-defined function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncMeta {
    /// Parameter names in call order.
    #[serde(default)]
    pub varnames: Vec<String>,
    /// Accepted particles per parameter position.
    #[serde(default)]
    pub josi: Vec<Vec<String>>,
}

/// Position and provenance data every node carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, alias = "startOffset", skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
    #[serde(default, alias = "endOffset", skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<usize>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub josi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FuncMeta>,
}

/// Whether a string literal interpolates `{name}` references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMode {
    #[default]
    Normal,
    Ex,
}

/// Declaration flavor of a local definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarType {
    #[serde(rename = "変数")]
    Variable,
    #[serde(rename = "定数")]
    Constant,
}

impl VarType {
    /// The keyword naming this flavor in source text.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Variable => "変数",
            Self::Constant => "定数",
        }
    }
}

/// A function call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Callee name as written, particles included.
    pub name: String,
    /// Arguments in particle order. A leading `None` stands for an omitted
    /// first argument.
    #[serde(default)]
    pub args: Vec<Option<Node>>,
    #[serde(default)]
    pub setter: bool,
}

/// One arm of a multi-way branch. An arm without a value is the else arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchArm {
    #[serde(default)]
    pub value: Option<Node>,
    pub block: Node,
}

/// A `key: value` member of an object literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonEntry {
    pub key: Node,
    pub value: Node,
}

/// Every construct the generator accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Nop,
    Block {
        #[serde(default)]
        block: Vec<Node>,
    },
    Comment {
        #[serde(default)]
        value: String,
    },
    Eol {
        #[serde(default)]
        value: String,
    },
    Break,
    Continue,
    End,
    Number {
        value: serde_json::Number,
    },
    String {
        value: String,
        #[serde(default)]
        mode: StringMode,
    },
    DefLocalVar {
        name: Box<Node>,
        #[serde(default)]
        value: Option<Box<Node>>,
        vartype: VarType,
    },
    Let {
        name: Box<Node>,
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    Word {
        value: String,
    },
    Variable {
        value: String,
    },
    Op {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    Calc {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    Renbun {
        left: Box<Node>,
        right: Box<Node>,
    },
    Not {
        value: Box<Node>,
    },
    Func(Call),
    FuncPointer(Call),
    CalcFunc(Call),
    If {
        expr: Box<Node>,
        block: Box<Node>,
        #[serde(default)]
        false_block: Option<Box<Node>>,
    },
    Promise {
        #[serde(default)]
        blocks: Vec<Node>,
    },
    For {
        #[serde(default)]
        word: Option<Box<Node>>,
        from: Box<Node>,
        to: Box<Node>,
        block: Box<Node>,
    },
    Foreach {
        #[serde(default)]
        target: Option<Box<Node>>,
        #[serde(default)]
        name: Option<Box<Node>>,
        block: Box<Node>,
    },
    RepeatTimes {
        value: Box<Node>,
        block: Box<Node>,
    },
    While {
        cond: Box<Node>,
        block: Box<Node>,
    },
    Switch {
        value: Box<Node>,
        #[serde(default)]
        cases: Vec<SwitchArm>,
    },
    LetArray {
        name: Box<Node>,
        #[serde(default)]
        index: Vec<Node>,
        value: Box<Node>,
    },
    RefArray {
        name: Box<Node>,
        #[serde(default)]
        index: Vec<Node>,
    },
    JsonArray {
        #[serde(default)]
        value: Vec<Node>,
    },
    JsonObj {
        #[serde(default)]
        value: Vec<JsonEntry>,
    },
    FuncObj {
        block: Box<Node>,
    },
    Bool {
        value: bool,
    },
    Null,
    DefTest {
        name: Box<Node>,
        block: Box<Node>,
    },
    DefFunc {
        name: Box<Node>,
        block: Box<Node>,
    },
    Return {
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    TryExcept {
        block: Box<Node>,
        #[serde(alias = "errBlock")]
        err_block: Box<Node>,
    },
    Require {
        value: String,
    },
}

impl NodeKind {
    /// The serialized `type` tag of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Block { .. } => "block",
            Self::Comment { .. } => "comment",
            Self::Eol { .. } => "eol",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::End => "end",
            Self::Number { .. } => "number",
            Self::String { .. } => "string",
            Self::DefLocalVar { .. } => "def_local_var",
            Self::Let { .. } => "let",
            Self::Word { .. } => "word",
            Self::Variable { .. } => "variable",
            Self::Op { .. } => "op",
            Self::Calc { .. } => "calc",
            Self::Renbun { .. } => "renbun",
            Self::Not { .. } => "not",
            Self::Func(_) => "func",
            Self::FuncPointer(_) => "func_pointer",
            Self::CalcFunc(_) => "calc_func",
            Self::If { .. } => "if",
            Self::Promise { .. } => "promise",
            Self::For { .. } => "for",
            Self::Foreach { .. } => "foreach",
            Self::RepeatTimes { .. } => "repeat_times",
            Self::While { .. } => "while",
            Self::Switch { .. } => "switch",
            Self::LetArray { .. } => "let_array",
            Self::RefArray { .. } => "ref_array",
            Self::JsonArray { .. } => "json_array",
            Self::JsonObj { .. } => "json_obj",
            Self::FuncObj { .. } => "func_obj",
            Self::Bool { .. } => "bool",
            Self::Null => "null",
            Self::DefTest { .. } => "def_test",
            Self::DefFunc { .. } => "def_func",
            Self::Return { .. } => "return",
            Self::TryExcept { .. } => "try_except",
            Self::Require { .. } => "require",
        }
    }
}

/// A node of the syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub info: NodeInfo,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Create a node without position information.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            info: NodeInfo::default(),
            kind,
        }
    }

    /// Decode a node tree from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn block(nodes: Vec<Node>) -> Self {
        Self::new(NodeKind::Block { block: nodes })
    }

    pub fn word(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Word { value: name.into() })
    }

    pub fn number(value: impl Into<serde_json::Number>) -> Self {
        Self::new(NodeKind::Number {
            value: value.into(),
        })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(NodeKind::String {
            value: value.into(),
            mode: StringMode::Normal,
        })
    }

    /// Create a call node with the given arguments.
    pub fn call(name: impl Into<String>, args: Vec<Option<Node>>) -> Self {
        Self::new(NodeKind::Func(Call {
            name: name.into(),
            args,
            setter: false,
        }))
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.info.line = Some(line);
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.info.file = Some(file.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.info.start_offset = Some(span.start());
        self.info.end_offset = Some(span.end());
        self
    }

    pub fn with_josi(mut self, josi: impl Into<String>) -> Self {
        self.info.josi = josi.into();
        self
    }

    pub fn with_meta(mut self, meta: FuncMeta) -> Self {
        self.info.meta = Some(meta);
        self
    }

    /// The identifier text of a `word` or `variable` node.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Word { value } | NodeKind::Variable { value } => Some(value),
            _ => None,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = Vec::new();
        match &self.kind {
            NodeKind::Nop
            | NodeKind::Comment { .. }
            | NodeKind::Eol { .. }
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::End
            | NodeKind::Number { .. }
            | NodeKind::String { .. }
            | NodeKind::Word { .. }
            | NodeKind::Variable { .. }
            | NodeKind::Bool { .. }
            | NodeKind::Null
            | NodeKind::Require { .. } => {}
            NodeKind::Block { block } => out.extend(block),
            NodeKind::Promise { blocks } => out.extend(blocks),
            NodeKind::JsonArray { value } => out.extend(value),
            NodeKind::DefLocalVar { name, value, .. } | NodeKind::Let { name, value } => {
                out.push(name);
                out.extend(value.as_deref());
            }
            NodeKind::Op { left, right, .. }
            | NodeKind::Calc { left, right, .. }
            | NodeKind::Renbun { left, right } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::Not { value } => out.push(value),
            NodeKind::Func(call) | NodeKind::FuncPointer(call) | NodeKind::CalcFunc(call) => {
                out.extend(call.args.iter().flatten());
            }
            NodeKind::If {
                expr,
                block,
                false_block,
            } => {
                out.push(expr);
                out.push(block);
                out.extend(false_block.as_deref());
            }
            NodeKind::For {
                word,
                from,
                to,
                block,
            } => {
                out.extend(word.as_deref());
                out.push(from);
                out.push(to);
                out.push(block);
            }
            NodeKind::Foreach {
                target,
                name,
                block,
            } => {
                out.extend(target.as_deref());
                out.extend(name.as_deref());
                out.push(block);
            }
            NodeKind::RepeatTimes { value, block } => {
                out.push(value);
                out.push(block);
            }
            NodeKind::While { cond, block } => {
                out.push(cond);
                out.push(block);
            }
            NodeKind::Switch { value, cases } => {
                out.push(value);
                for arm in cases {
                    out.extend(arm.value.as_ref());
                    out.push(&arm.block);
                }
            }
            NodeKind::LetArray { name, index, value } => {
                out.push(name);
                out.extend(index);
                out.push(value);
            }
            NodeKind::RefArray { name, index } => {
                out.push(name);
                out.extend(index);
            }
            NodeKind::JsonObj { value } => {
                for entry in value {
                    out.push(&entry.key);
                    out.push(&entry.value);
                }
            }
            NodeKind::FuncObj { block } => out.push(block),
            NodeKind::DefTest { name, block } | NodeKind::DefFunc { name, block } => {
                out.push(name);
                out.push(block);
            }
            NodeKind::Return { value } => out.extend(value.as_deref()),
            NodeKind::TryExcept { block, err_block } => {
                out.push(block);
                out.push(err_block);
            }
        }
        out
    }

    /// Visit this node and all of its descendants depth-first, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}
