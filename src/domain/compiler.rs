//! Prompt compiler: walks the composition and produces the positive and negative
//! token lists.
//!
//! Output order is always the tree's depth-first, left-to-right order. A disabled
//! node silences its whole subtree, and a negative group swaps the two lists its
//! subtree produced before handing them to its parent.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::arena::{Composition, NodeData, NodeId, TreeNode};
use crate::domain::entities::Factor;
use crate::domain::error::DomainResult;

/// Separator between tokens in the assembled prompt strings.
pub const TOKEN_SEPARATOR: &str = ", ";

/// How a group's factor reaches the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorPolicy {
    /// Join each side of the group's output and wrap it once: `(a, b:1.20)`.
    #[default]
    Wrap,
    /// Hand the factor down to immediate fragment children without their own.
    Inherit,
}

impl fmt::Display for FactorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorPolicy::Wrap => write!(f, "wrap"),
            FactorPolicy::Inherit => write!(f, "inherit"),
        }
    }
}

impl FromStr for FactorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wrap" => Ok(FactorPolicy::Wrap),
            "inherit" => Ok(FactorPolicy::Inherit),
            other => Err(format!("unknown factor policy: {other}")),
        }
    }
}

/// Compiled token lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Prompt {
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    fn append(&mut self, other: Prompt) {
        self.positive.extend(other.positive);
        self.negative.extend(other.negative);
    }

    fn swap_sides(&mut self) {
        std::mem::swap(&mut self.positive, &mut self.negative);
    }

    /// Join both lists for the host fields, dropping blank entries.
    pub fn assemble(&self) -> CompiledPrompt {
        CompiledPrompt {
            positive: join_tokens(&self.positive),
            negative: join_tokens(&self.negative),
        }
    }
}

/// Final strings pushed into the host's text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledPrompt {
    pub positive: String,
    pub negative: String,
}

fn join_tokens(tokens: &[String]) -> String {
    tokens
        .iter()
        .filter(|t| !t.trim().is_empty())
        .join(TOKEN_SEPARATOR)
}

/// Render `content` with its emphasis; absent factors and `1.00` leave it bare.
pub fn weighted(content: &str, factor: Option<Factor>) -> String {
    match factor {
        Some(factor) if !factor.is_one() => format!("({content}:{factor})"),
        _ => content.to_string(),
    }
}

/// Compile the whole tree: the top-level sequence concatenated in order.
#[instrument(level = "debug", skip(tree))]
pub fn compile(tree: &Composition, policy: FactorPolicy) -> Prompt {
    let mut prompt = Prompt::default();
    for &id in tree.roots() {
        if let Some(node) = tree.get_node(id) {
            prompt.append(compile_tree_node(tree, node, None, policy));
        }
    }
    prompt
}

/// Compile a single subtree as if it were the only top-level node.
pub fn compile_node(tree: &Composition, id: NodeId, policy: FactorPolicy) -> DomainResult<Prompt> {
    let node = tree.node(id)?;
    Ok(compile_tree_node(tree, node, None, policy))
}

fn compile_tree_node(
    tree: &Composition,
    node: &TreeNode,
    inherited: Option<Factor>,
    policy: FactorPolicy,
) -> Prompt {
    let mut prompt = Prompt::default();
    if !node.data.enabled() {
        return prompt;
    }
    match &node.data {
        NodeData::Fragment(fragment) => {
            if fragment.is_blank() {
                return prompt;
            }
            let token = weighted(&fragment.text, fragment.factor.or(inherited));
            if fragment.negative {
                prompt.negative.push(token);
            } else {
                prompt.positive.push(token);
            }
        }
        NodeData::Group(group) => {
            let default_factor = match policy {
                FactorPolicy::Inherit => group.factor,
                FactorPolicy::Wrap => None,
            };
            for &child in &node.children {
                if let Some(child_node) = tree.get_node(child) {
                    // only immediate fragments inherit; nested groups start fresh
                    let passed = if child_node.data.is_group() {
                        None
                    } else {
                        default_factor
                    };
                    prompt.append(compile_tree_node(tree, child_node, passed, policy));
                }
            }
            if policy == FactorPolicy::Wrap {
                prompt.positive = wrap_side(prompt.positive, group.factor);
                prompt.negative = wrap_side(prompt.negative, group.factor);
            }
            if group.negative {
                prompt.swap_sides();
            }
        }
    }
    prompt
}

fn wrap_side(tokens: Vec<String>, factor: Option<Factor>) -> Vec<String> {
    match factor {
        Some(factor) if !factor.is_one() && !tokens.is_empty() => {
            vec![weighted(&tokens.join(TOKEN_SEPARATOR), Some(factor))]
        }
        _ => tokens,
    }
}
