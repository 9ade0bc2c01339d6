/// Strip the domain suffix and the connection-instance suffix from a JID.
///
/// `15551234567:12@s.whatsapp.net` becomes `15551234567`.
pub fn bare_id(jid: &str) -> &str {
    let local = jid.split('@').next().unwrap_or(jid);
    local.split(':').next().unwrap_or(local)
}

/// Ordered set of bare sender identifiers allowed to trigger the bridge.
///
/// Unlike an open allowlist, an empty whitelist admits nobody: only
/// self-authored events pass the sender gate then.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    entries: Vec<String>,
}

impl Whitelist {
    /// Build from raw entries. Entries are trimmed, reduced to their bare
    /// identifier, and deduplicated keeping the first occurrence.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for entry in entries {
            let id = bare_id(entry.as_ref().trim());
            if !id.is_empty() && !list.entries.iter().any(|e| e == id) {
                list.entries.push(id.to_string());
            }
        }
        list
    }

    /// Parse a comma-separated list such as `ALLOWED_NUMBERS`.
    pub fn parse(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Whether the bare form of `sender` is listed.
    pub fn contains(&self, sender: &str) -> bool {
        let id = bare_id(sender);
        self.entries.iter().any(|e| e == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
