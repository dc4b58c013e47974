use std::sync::LazyLock;

use regex::Regex;

/// Orchestrator-generated pod name suffixes, most specific first:
/// ReplicaSet template hash + pod hash, StatefulSet ordinal, generic 5-char hash.
///
/// Compiled once and only ever read, so sharing it across threads is safe.
static POD_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)-[^%-]{10}-[^%-]{5}$|^(.+?)-[0-9]+$|^(.+?)-[^%-]{5}$")
        .expect("valid pod suffix regex")
});

/// Strip one generated suffix from a pod name, yielding its workload group.
///
/// `document-generation-6499cbb75b-65lmt` becomes `document-generation`,
/// `argocd-application-controller-0` becomes `argocd-application-controller`.
/// Names without a recognized suffix are returned unchanged.
pub fn pod_group(pod_name: &str) -> &str {
    let Some(caps) = POD_SUFFIX_RE.captures(pod_name) else {
        return pod_name;
    };
    (1..=3)
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str())
        .unwrap_or(pod_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_pod() {
        assert_eq!(
            pod_group("document-generation-6499cbb75b-65lmt"),
            "document-generation"
        );
    }

    #[test]
    fn test_statefulset_pod() {
        assert_eq!(
            pod_group("argocd-application-controller-0"),
            "argocd-application-controller"
        );
        assert_eq!(pod_group("postgres-12"), "postgres");
    }

    #[test]
    fn test_job_or_daemonset_pod() {
        assert_eq!(pod_group("worker-12438-m76v7"), "worker-12438");
        assert_eq!(pod_group("fluent-bit-x7k2q"), "fluent-bit");
    }

    #[test]
    fn test_unrecognized_suffix_unchanged() {
        assert_eq!(
            pod_group("argocd-application-controller-d"),
            "argocd-application-controller-d"
        );
        assert_eq!(pod_group("standalone"), "standalone");
        assert_eq!(pod_group(""), "");
    }

    #[test]
    fn test_percent_is_not_a_hash_char() {
        assert_eq!(pod_group("app-ab%de"), "app-ab%de");
        assert_eq!(pod_group("app-6499cbb75b-65l%t"), "app-6499cbb75b-65l%t");
    }

    #[test]
    fn test_typical_groups_are_stable() {
        for name in [
            "document-generation-6499cbb75b-65lmt",
            "argocd-application-controller-0",
            "fluent-bit-x7k2q",
            "standalone",
        ] {
            let group = pod_group(name);
            assert_eq!(pod_group(group), group);
        }
    }

    #[test]
    fn test_suffix_shaped_groups_strip_again() {
        // one suffix per call; a group ending in a suffix-shaped segment loses it next time
        assert_eq!(pod_group("kube-proxy-x7k2q"), "kube-proxy");
        assert_eq!(pod_group("kube-proxy"), "kube");
        assert_eq!(pod_group("my-app-redis-0"), "my-app-redis");
        assert_eq!(pod_group("my-app-redis"), "my-app");
    }
}
