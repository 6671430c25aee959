//! Window title rendering

/// Values substituted into the title template
#[derive(Debug, Clone, Default)]
pub struct TitleVars<'a> {
    pub container: &'a str,
    pub hostname: &'a str,
    pub remote_addr: &'a str,
    pub pid: Option<u32>,
}

/// The local machine's hostname
pub fn local_hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

/// Render a title template
///
/// Unknown placeholders are left as written.
pub fn render_title(format: &str, vars: &TitleVars<'_>) -> String {
    let pid = vars.pid.map(|p| p.to_string()).unwrap_or_default();
    format
        .replace("{container}", vars.container)
        .replace("{hostname}", vars.hostname)
        .replace("{remote_addr}", vars.remote_addr)
        .replace("{pid}", &pid)
}
