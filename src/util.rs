//! Small helpers shared across stack kinds.

use rand::Rng;

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random lowercase alphanumeric string of the given length.
pub fn random_alphanumeric_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

/// Strip the scheme from an OIDC issuer URL.
///
/// IRSA trust policies and provider lookups use the bare issuer host/path,
/// e.g. `oidc.eks.us-east-2.amazonaws.com/id/ABC123`.
pub fn bare_oidc_issuer(issuer_url: &str) -> &str {
    issuer_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
}

/// Render the IRSA trust policy for a Kubernetes service account.
///
/// The `sub` condition pins the role to one service account in one
/// namespace; the `aud` condition pins the audience to STS.
pub fn irsa_trust_policy(
    aws_account_id: &str,
    oidc_issuer_url: &str,
    namespace: &str,
    service_account_name: &str,
) -> String {
    let issuer = bare_oidc_issuer(oidc_issuer_url);
    format!(
        r#"{{
    "Version": "2012-10-17",
    "Statement": [
        {{
            "Effect": "Allow",
            "Principal": {{
                "Federated": "arn:aws:iam::{aws_account_id}:oidc-provider/{issuer}"
            }},
            "Action": "sts:AssumeRoleWithWebIdentity",
            "Condition": {{
                "StringEquals": {{
                    "{issuer}:sub": "system:serviceaccount:{namespace}:{service_account_name}",
                    "{issuer}:aud": "sts.amazonaws.com"
                }}
            }}
        }}
    ]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_string_has_requested_length_and_charset() {
        let s = random_alphanumeric_string(12);
        assert_eq!(s.len(), 12);
        assert!(s.bytes().all(|b| ALPHANUMERIC.contains(&b)));
    }

    #[test]
    fn bare_issuer_strips_scheme_only() {
        assert_eq!(
            bare_oidc_issuer("https://oidc.eks.us-east-2.amazonaws.com/id/ABC"),
            "oidc.eks.us-east-2.amazonaws.com/id/ABC"
        );
        assert_eq!(bare_oidc_issuer("oidc.example.com/id/ABC"), "oidc.example.com/id/ABC");
    }

    #[test]
    fn trust_policy_pins_service_account_and_audience() {
        let doc = irsa_trust_policy(
            "111111111111",
            "https://oidc.eks.us-east-2.amazonaws.com/id/ABC",
            "external-dns",
            "external-dns",
        );
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        let condition = &parsed["Statement"][0]["Condition"]["StringEquals"];
        assert_eq!(
            condition["oidc.eks.us-east-2.amazonaws.com/id/ABC:sub"],
            "system:serviceaccount:external-dns:external-dns"
        );
        assert_eq!(
            condition["oidc.eks.us-east-2.amazonaws.com/id/ABC:aud"],
            "sts.amazonaws.com"
        );
        assert_eq!(
            parsed["Statement"][0]["Principal"]["Federated"],
            "arn:aws:iam::111111111111:oidc-provider/oidc.eks.us-east-2.amazonaws.com/id/ABC"
        );
    }
}
