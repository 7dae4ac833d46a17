//! Doc comment tags: `@return`, `@var`, `@param` and `@property`.

/// A `@property`, `@property-read` or `@property-write` tag of a class doc
/// comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTag {
    /// The type as written, e.g. `\Namespaced\Class_` or `int|null`.
    pub type_text: String,
    /// Variable name without the `$`. Empty when the tag names none.
    pub variable: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: String,
    body: String,
}

/// A parsed `/** ... */` comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    summary: String,
    tags: Vec<Tag>,
}

impl DocBlock {
    #[must_use]
    pub fn parse(comment: &str) -> Self {
        let inner = comment
            .trim()
            .trim_start_matches("/**")
            .trim_end_matches("*/");

        let mut summary: Vec<&str> = Vec::new();
        let mut tags: Vec<Tag> = Vec::new();
        let mut in_summary = true;
        for line in inner.lines() {
            let line = line.trim();
            let line = line.strip_prefix('*').unwrap_or(line).trim();
            if let Some(tag) = line.strip_prefix('@') {
                in_summary = false;
                let (name, body) = tag.split_once(char::is_whitespace).unwrap_or((tag, ""));
                tags.push(Tag {
                    name: name.to_string(),
                    body: body.trim().to_string(),
                });
            } else if line.is_empty() {
                if !summary.is_empty() {
                    in_summary = false;
                }
            } else if let Some(last) = tags.last_mut() {
                if !last.body.is_empty() {
                    last.body.push(' ');
                }
                last.body.push_str(line);
            } else if in_summary {
                summary.push(line);
            }
        }

        Self {
            summary: summary.join(" "),
            tags,
        }
    }

    /// The free text before the first blank line or tag.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    fn tag_bodies<'a>(&'a self, names: &'a [&str]) -> impl Iterator<Item = &'a str> {
        self.tags
            .iter()
            .filter(|tag| names.contains(&tag.name.as_str()))
            .map(|tag| tag.body.as_str())
    }

    /// Types listed by the first `@return` tag.
    #[must_use]
    pub fn return_types(&self) -> Vec<String> {
        self.tag_bodies(&["return"])
            .next()
            .map(|body| split_union(split_type(body).0))
            .unwrap_or_default()
    }

    /// Types listed by the first `@var` tag.
    #[must_use]
    pub fn var_types(&self) -> Vec<String> {
        self.tag_bodies(&["var"])
            .next()
            .map(|body| split_union(split_type(body).0))
            .unwrap_or_default()
    }

    /// Types of the `@param` tag documenting `$name`.
    #[must_use]
    pub fn param_types(&self, name: &str) -> Vec<String> {
        self.tag_bodies(&["param"])
            .find_map(|body| {
                let (type_text, rest) = split_type(body);
                let variable = rest.split_whitespace().next()?;
                let variable = variable.trim_start_matches('&').trim_start_matches("...");
                (variable.strip_prefix('$') == Some(name)).then(|| split_union(type_text))
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn property_tags(&self) -> Vec<PropertyTag> {
        self.tag_bodies(&["property", "property-read", "property-write"])
            .map(parse_property_tag)
            .collect()
    }
}

fn parse_property_tag(body: &str) -> PropertyTag {
    let (type_text, rest) = if body.starts_with('$') {
        ("", body)
    } else {
        split_type(body)
    };
    let rest = rest.trim_start();
    let (variable, description) = match rest.strip_prefix('$') {
        Some(named) => {
            let (variable, description) = named
                .split_once(char::is_whitespace)
                .unwrap_or((named, ""));
            (variable.to_string(), description.trim().to_string())
        }
        None => (String::new(), rest.trim().to_string()),
    };
    PropertyTag {
        type_text: type_text.to_string(),
        variable,
        description,
    }
}

/// Split a tag body into its leading type and the remainder.
///
/// Whitespace inside `<...>`, `(...)`, `{...}` or `[...]` belongs to the type,
/// so `array<string, int> $map` yields `array<string, int>`.
fn split_type(body: &str) -> (&str, &str) {
    let body = body.trim_start();
    let mut depth = 0usize;
    for (index, ch) in body.char_indices() {
        match ch {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' | ')' | '}' | ']' => depth = depth.saturating_sub(1),
            ch if ch.is_whitespace() && depth == 0 => return body.split_at(index),
            _ => {}
        }
    }
    (body, "")
}

/// Split `int|Foo[]|array<int|string, mixed>` on top-level `|` only.
#[must_use]
pub fn split_union(type_text: &str) -> Vec<String> {
    let mut members = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in type_text.chars() {
        match ch {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' | ')' | '}' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if ch == '|' && depth == 0 {
            members.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    members.push(current);
    members
        .into_iter()
        .map(|member| member.trim().to_string())
        .filter(|member| !member.is_empty())
        .collect()
}
