//! Recognise the minimal "user zone file" shape — a DNS zone file carrying
//! at least one `URI` resource record pointing at a profile or token file.
//! Anything else isn't a user zone file, and the replicator skips
//! token-file replication for it, mirroring the original registrar's
//! `try`/`except` around `blockstack_zones.parse_zone_file`: a parse
//! failure there just means "nothing to replicate", not an error.

/// A recognised user zone file: the raw payload plus the target URI its
/// first `URI` record points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserZonefile<'a> {
    pub payload: &'a str,
    pub uri_target: &'a str,
}

/// Parse `zonefile` looking for a `URI` resource record
/// (`<name> URI <priority> <weight> "<target>"`, RFC 7553 shape). Returns
/// `None` if no such record is found — not a user zone file, or malformed.
pub fn parse_user_zonefile(zonefile: &str) -> Option<UserZonefile<'_>> {
    for line in zonefile.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('$') || trimmed.starts_with(';') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let Some(uri_pos) = fields.iter().position(|f| f.eq_ignore_ascii_case("URI")) else {
            continue;
        };
        let target = fields[uri_pos + 1..]
            .iter()
            .find(|f| f.starts_with('"'))
            .map(|f| f.trim_matches('"'));
        if let Some(target) = target {
            if !target.is_empty() {
                return Some(UserZonefile {
                    payload: zonefile,
                    uri_target: target,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_a_uri_record() {
        let zonefile = "$ORIGIN alice.id\n$TTL 3600\n_https._tcp URI 10 1 \"https://example.com/profile.json\"\n";
        let parsed = parse_user_zonefile(zonefile).unwrap();
        assert_eq!(parsed.uri_target, "https://example.com/profile.json");
    }

    #[test]
    fn rejects_a_zonefile_with_no_uri_record() {
        assert!(parse_user_zonefile("$ORIGIN alice.id\n$TTL 3600\n").is_none());
    }

    #[test]
    fn ignores_comments_and_directives() {
        let zonefile = "; a comment\n$TTL 3600\n_https._tcp URI 10 1 \"https://example.com/p.json\"\n";
        assert!(parse_user_zonefile(zonefile).is_some());
    }
}
