use crate::configs::Config;

const ART: [&str; 4] = [
    "  _  _         _ _      _    ",
    " | \\| |_____ _| (_)_ _ | |__ ",
    " | .` / -_) \\ / | | ' \\| / / ",
    " |_|\\_\\___/_\\_\\_|_|_||_|_\\_\\ ",
];

const ACCENT: &str = "\x1b[35m";
const LABEL: &str = "\x1b[1m";
const MUTED: &str = "\x1b[90m";
const VALUE: &str = "\x1b[36m";
const CLEAR: &str = "\x1b[0m";

/// What the monitor binary shows on startup.
pub struct BannerInfo {
    pub version: &'static str,
    pub build: &'static str,
    pub default_volume: u16,
    /// `identifier -> ws url` for every configured node.
    pub nodes: Vec<(String, String)>,
}

impl BannerInfo {
    pub fn from_config(config: &Config) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            build: match cfg!(debug_assertions) {
                true => "dev",
                false => "optimized",
            },
            default_volume: config.player.default_volume,
            nodes: config
                .nodes
                .iter()
                .map(|n| (n.identifier.clone(), n.ws_url()))
                .collect(),
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("version", self.version.to_owned()),
            ("build", self.build.to_owned()),
            ("volume", self.default_volume.to_string()),
        ];
        rows.extend(
            self.nodes
                .iter()
                .map(|(id, url)| ("node", format!("{id} {MUTED}{url}"))),
        );
        rows
    }
}

pub fn print_banner(info: &BannerInfo) {
    let mut out = String::from("\n");
    for line in ART {
        out.push_str(&format!("{ACCENT}{line}{CLEAR}\n"));
    }
    out.push('\n');
    for (label, value) in info.rows() {
        out.push_str(&format!("  {LABEL}{label:>8}{CLEAR}  {VALUE}{value}{CLEAR}\n"));
    }
    println!("{out}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_configured_node() {
        let info = BannerInfo::from_config(&Config::default());
        let rows = info.rows();
        assert_eq!(rows.iter().filter(|(label, _)| *label == "node").count(), 1);
        assert!(rows.iter().any(|(_, v)| v.contains("ws://localhost:3000/")));
    }
}
