//! Resource naming

/// Namespace used in place of the environment type for resources shared by
/// every environment.
pub const COMMON_NAMESPACE: &str = "common";

/// Builds the canonical `{system}-{env}-{label}` resource name.
pub fn create_resource_name(system_name: &str, env_type: &str, label: &str) -> String {
    format!("{}-{}-{}", system_name, env_type, label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_resource_name() {
        assert_eq!(
            create_resource_name("myCdk", "dev", "backend-repo"),
            "myCdk-dev-backend-repo"
        );
    }

    #[test]
    fn test_create_resource_name_keeps_case() {
        assert_eq!(
            create_resource_name("MySystem", COMMON_NAMESPACE, "Pipeline"),
            "MySystem-common-Pipeline"
        );
    }

    #[test]
    fn test_create_resource_name_no_extra_formatting() {
        let cases = [
            ("a", "test", "b"),
            ("sys", "prod", "alb"),
            ("x-y", "stage", "z_w"),
            ("", "", ""),
        ];
        for (system, env, label) in cases {
            assert_eq!(
                create_resource_name(system, env, label),
                format!("{system}-{env}-{label}")
            );
        }
    }
}
