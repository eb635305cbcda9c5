//! Bounded rendering of the scopes of an analyzed project.
//!
//! The reference graph is walked as a tree, so a shared sub-dependency is
//! rendered once per path that reaches it. Re-entering an identifier already
//! on the current path yields a leaf marked `cycle`; going deeper than the
//! limit yields a leaf marked `truncated`.

use depscan_model::{
    AnalyzedProject, Identifier, Issue, PackageReference, Scope,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub id: Identifier,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DependencyNode>,
    #[serde(default)]
    pub cycle: bool,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTree {
    pub name: String,
    pub dependencies: Vec<DependencyNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDependencyTree {
    pub id: Identifier,
    pub definition_file_path: String,
    pub scopes: Vec<ScopeTree>,
}

impl ProjectDependencyTree {
    /// Direct dependencies sit at depth 1; `max_depth` of 0 keeps only the
    /// scope names.
    pub fn build(project: &AnalyzedProject, max_depth: usize) -> Self {
        Self {
            id: project.id.clone(),
            definition_file_path: project.definition_file_path.clone(),
            scopes: project
                .scopes
                .iter()
                .map(|scope| scope_tree(scope, max_depth))
                .collect(),
        }
    }
}

fn scope_tree(scope: &Scope, max_depth: usize) -> ScopeTree {
    let mut path = Vec::new();
    let dependencies = if max_depth == 0 {
        Vec::new()
    } else {
        scope
            .dependencies
            .iter()
            .map(|reference| render(reference, &mut path, 1, max_depth))
            .collect()
    };
    ScopeTree {
        name: scope.name.clone(),
        dependencies,
    }
}

fn render<'a>(
    reference: &'a PackageReference,
    path: &mut Vec<&'a Identifier>,
    depth: usize,
    max_depth: usize,
) -> DependencyNode {
    let mut node = DependencyNode {
        id: reference.id.clone(),
        issues: reference.issues.clone(),
        children: Vec::new(),
        cycle: false,
        truncated: false,
    };

    if path.contains(&&reference.id) {
        node.cycle = true;
        return node;
    }
    if reference.dependencies.is_empty() {
        return node;
    }
    if depth >= max_depth {
        node.truncated = true;
        return node;
    }

    path.push(&reference.id);
    node.children = reference
        .dependencies
        .iter()
        .map(|child| render(child, path, depth + 1, max_depth))
        .collect();
    path.pop();
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identifier {
        Identifier::new("Maven", "org.example", name, "1.0")
    }

    fn reference(
        name: &str,
        dependencies: Vec<PackageReference>,
    ) -> PackageReference {
        PackageReference {
            id: id(name),
            dependencies,
            issues: Vec::new(),
        }
    }

    fn project(dependencies: Vec<PackageReference>) -> AnalyzedProject {
        AnalyzedProject {
            id: id("app"),
            definition_file_path: "pom.xml".into(),
            scopes: vec![Scope {
                name: "compile".into(),
                dependencies,
            }],
            ..AnalyzedProject::default()
        }
    }

    #[test]
    fn nested_references_become_children() {
        let tree = ProjectDependencyTree::build(
            &project(vec![reference("a", vec![reference("b", vec![])])]),
            DEFAULT_MAX_DEPTH,
        );
        let a = &tree.scopes[0].dependencies[0];
        assert_eq!(a.id.name, "a");
        assert_eq!(a.children[0].id.name, "b");
        assert!(!a.truncated && !a.cycle);
    }

    #[test]
    fn depth_limit_truncates() {
        let d = reference("d", vec![]);
        let chain =
            reference("a", vec![reference("b", vec![reference("c", vec![d])])]);
        let tree = ProjectDependencyTree::build(&project(vec![chain]), 2);
        let b = &tree.scopes[0].dependencies[0].children[0];
        assert_eq!(b.id.name, "b");
        assert!(b.truncated);
        assert!(b.children.is_empty());
    }

    #[test]
    fn reentering_an_ancestor_is_a_cycle() {
        let x = reference("x", vec![]);
        let looped =
            reference("a", vec![reference("b", vec![reference("a", vec![x])])]);
        let tree = ProjectDependencyTree::build(
            &project(vec![looped]),
            DEFAULT_MAX_DEPTH,
        );
        let inner_a = &tree.scopes[0].dependencies[0].children[0].children[0];
        assert!(inner_a.cycle);
        assert!(inner_a.children.is_empty());
    }

    #[test]
    fn siblings_sharing_a_dependency_are_not_cycles() {
        let shared = || reference("shared", vec![]);
        let tree = ProjectDependencyTree::build(
            &project(vec![
                reference("a", vec![shared()]),
                reference("b", vec![shared()]),
            ]),
            DEFAULT_MAX_DEPTH,
        );
        for dep in &tree.scopes[0].dependencies {
            assert!(!dep.children[0].cycle);
        }
    }

    #[test]
    fn zero_depth_keeps_only_scopes() {
        let tree = ProjectDependencyTree::build(
            &project(vec![reference("a", vec![])]),
            0,
        );
        assert_eq!(tree.scopes[0].name, "compile");
        assert!(tree.scopes[0].dependencies.is_empty());
    }
}
