pub const DEPENDENCY_TREE: &str = "maven-appraiser.dependencyTree";
pub const GO_TO_EFFECTIVE: &str = "maven-appraiser.goToEffective";
pub const REFRESH: &str = "maven-appraiser.refresh";

pub fn supported_commands() -> Vec<String> {
    vec![
        DEPENDENCY_TREE.to_string(),
        GO_TO_EFFECTIVE.to_string(),
        REFRESH.to_string(),
    ]
}
