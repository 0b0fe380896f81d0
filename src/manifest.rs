//! The subset of `package.json` that slink reads.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::path::Path;

pub const PACKAGE_JSON: &str = "package.json";
pub const NODE_MODULES: &str = "node_modules";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: IndexMap<String, String>,

    /// Scoped groups of source directories linked under `node_modules/<group>/`.
    #[serde(default, rename = "dependencySLinkGroups")]
    pub dependency_slink_groups: Option<Vec<SLinkGroup>>,
    /// Environment variables naming a directory with a shared `node_modules`.
    #[serde(default, rename = "sharedNodeModuleProjectSLinkEnvVar")]
    pub shared_node_module_env_vars: Option<Vec<String>>,
    /// Sibling projects whose `node_modules` may be shared, in priority order.
    #[serde(default, rename = "sharedNodeModuleProjectSLinks")]
    pub shared_node_module_projects: Option<Vec<String>>,
    /// Sibling projects whose `src` is linked as `<project>@slink`.
    #[serde(default, rename = "dependencySrcSLinks")]
    pub dependency_src_slinks: Option<Vec<SrcSLink>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SLinkGroup {
    /// Scope directory name, e.g. `@adligo`
    pub group: String,
    #[serde(default)]
    pub projects: Vec<GroupProject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupProject {
    pub project: String,
    /// Directory inside the sibling project; its last segment names the link.
    pub module_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SrcSLink {
    pub project: String,
}

/// One step of the link pass, produced from the manifest keys that are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDeclaration {
    /// First set environment variable provides `node_modules`.
    EnvVar(Vec<String>),
    /// First sibling project found provides `node_modules`.
    Project(Vec<String>),
    /// Each sibling's `src` is linked into the project root.
    Src(Vec<SrcSLink>),
    /// Each project's module path is linked into `node_modules/<group>/`.
    Group(SLinkGroup),
}

impl Manifest {
    pub fn from_value(value: Value, path: &Path) -> Result<Self> {
        serde_json::from_value(value).with_context(|| format!("Invalid {}", path))
    }

    /// The ordered link pipeline; keys missing from the manifest contribute nothing.
    pub fn link_plan(&self) -> Vec<LinkDeclaration> {
        let mut plan = Vec::new();
        if let Some(vars) = &self.shared_node_module_env_vars {
            plan.push(LinkDeclaration::EnvVar(vars.clone()));
        }
        if let Some(projects) = &self.shared_node_module_projects {
            plan.push(LinkDeclaration::Project(projects.clone()));
        }
        if let Some(links) = &self.dependency_src_slinks {
            plan.push(LinkDeclaration::Src(links.clone()));
        }
        if let Some(groups) = &self.dependency_slink_groups {
            plan.extend(groups.iter().cloned().map(LinkDeclaration::Group));
        }
        plan
    }

    /// `dependencies` followed by `devDependencies`; a dev entry overrides
    /// the version of a regular entry with the same name.
    pub fn all_dependencies(&self) -> IndexMap<&str, &str> {
        self.dependencies
            .iter()
            .chain(&self.dev_dependencies)
            .map(|(name, version)| (name.as_str(), version.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest_path() -> Path {
        Path::parse("/proj/package.json", false).unwrap()
    }

    #[test]
    fn test_empty_manifest_has_empty_plan() {
        let manifest = Manifest::from_value(json!({"name": "demo"}), &manifest_path()).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("demo"));
        assert!(manifest.link_plan().is_empty());
    }

    #[test]
    fn test_link_plan_order() {
        let manifest = Manifest::from_value(
            json!({
                "dependencySLinkGroups": [
                    {"group": "@a", "projects": [{"project": "pa", "modulePath": "src"}]},
                    {"group": "@b", "projects": []}
                ],
                "dependencySrcSLinks": [{"project": "lib"}],
                "sharedNodeModuleProjectSLinks": ["deps"],
                "sharedNodeModuleProjectSLinkEnvVar": ["SHARED"]
            }),
            &manifest_path(),
        )
        .unwrap();

        let plan = manifest.link_plan();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan[0], LinkDeclaration::EnvVar(vec!["SHARED".into()]));
        assert_eq!(plan[1], LinkDeclaration::Project(vec!["deps".into()]));
        assert_eq!(
            plan[2],
            LinkDeclaration::Src(vec![SrcSLink {
                project: "lib".into()
            }])
        );
        match &plan[3] {
            LinkDeclaration::Group(group) => {
                assert_eq!(group.group, "@a");
                assert_eq!(group.projects[0].module_path, "src");
            }
            other => panic!("Expected group, got {:?}", other),
        }
        assert!(matches!(&plan[4], LinkDeclaration::Group(g) if g.group == "@b"));
    }

    #[test]
    fn test_present_but_empty_key_still_plans_phase() {
        let manifest = Manifest::from_value(
            json!({"sharedNodeModuleProjectSLinks": []}),
            &manifest_path(),
        )
        .unwrap();
        assert_eq!(manifest.link_plan(), vec![LinkDeclaration::Project(vec![])]);
    }

    #[test]
    fn test_wrong_shape_names_manifest() {
        let err = Manifest::from_value(
            json!({"sharedNodeModuleProjectSLinks": "not-an-array"}),
            &manifest_path(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid /proj/package.json");
    }

    #[test]
    fn test_all_dependencies_merges_in_order() {
        let manifest = Manifest::from_value(
            json!({
                "dependencies": {"zod": "3.0.0", "lodash": "4.17.21"},
                "devDependencies": {"typescript": "5.4.0", "zod": "3.1.0"}
            }),
            &manifest_path(),
        )
        .unwrap();

        let all: Vec<(&str, &str)> = manifest.all_dependencies().into_iter().collect();
        assert_eq!(
            all,
            vec![
                ("zod", "3.1.0"),
                ("lodash", "4.17.21"),
                ("typescript", "5.4.0")
            ]
        );
    }
}
