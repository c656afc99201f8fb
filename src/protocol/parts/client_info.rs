use crate::protocol::parts::length_indicator;
use crate::protocol::util;
use crate::ScnpResult;
use std::collections::BTreeMap;

// Key/value strings describing the client application. Sent once after
// authentication (on servers that accept it) and again whenever a value
// was changed. Encoded as a flat sequence of length-prefixed CESU-8
// strings; the argument count is the number of strings, not of pairs.
#[derive(Clone, Debug, Default)]
pub(crate) struct ClientInfo(BTreeMap<String, String>);

impl ClientInfo {
    pub fn set_application(&mut self, application: impl AsRef<str>) {
        self.set("APPLICATION", application.as_ref());
    }
    pub fn set_application_version(&mut self, version: &str) {
        self.set("APPLICATIONVERSION", version);
    }
    pub fn set_application_source(&mut self, source: &str) {
        self.set("APPLICATIONSOURCE", source);
    }
    pub fn set_application_user(&mut self, user: &str) {
        self.set("APPLICATIONUSER", user);
    }

    fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count(&self) -> usize {
        self.0.len() * 2
    }

    pub fn size(&self) -> usize {
        self.0
            .iter()
            .map(|(k, v)| {
                let (lk, lv) = (util::cesu8_length(k), util::cesu8_length(v));
                length_indicator::size(lk) + lk + length_indicator::size(lv) + lv
            })
            .sum()
    }

    pub fn emit(&self, w: &mut dyn std::io::Write) -> ScnpResult<()> {
        for (key, value) in &self.0 {
            emit_string(key, w)?;
            emit_string(value, w)?;
        }
        Ok(())
    }
}

fn emit_string(s: &str, w: &mut dyn std::io::Write) -> ScnpResult<()> {
    let bytes = util::to_cesu8(s);
    length_indicator::emit(bytes.len(), w)?;
    w.write_all(&bytes)?;
    Ok(())
}

impl std::fmt::Display for ClientInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (k, v) in &self.0 {
            writeln!(f, "{k} = {v}")?;
        }
        Ok(())
    }
}
