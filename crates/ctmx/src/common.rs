//! 🧩 Little helpers shared by more than one backend.

/// 🪄 Fill `{{key}}` placeholders from `lookup`. Unknown keys render as empty strings,
/// an unterminated `{{` is left alone.
///
/// ```text
/// "{{job_name}} on {{data_center}}"  ──▶  "NIGHTLY-ETL on psctm"
/// ```
pub(crate) fn render_template<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let key = after_open[..end].trim();
                rendered.push_str(&lookup(key).unwrap_or_default());
                rest = &after_open[end + 2..];
            }
            None => {
                rendered.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    rendered.push_str(rest);
    rendered
}
