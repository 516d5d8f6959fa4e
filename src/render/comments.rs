//! Provenance comment block written above the CSV header.
//!
//! Each run prepends its own banner to the comment blocks of its inputs, so
//! an archive carries the history of every run that produced it.

use std::path::PathBuf;

const WIDTH: usize = 80;

/// The options of one run, as recorded in the output.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    pub infiles: Vec<PathBuf>,
    pub outfile: Option<PathBuf>,
    pub user: Option<String>,
    pub language: Option<String>,
    pub query: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub force: bool,
    pub number: Option<usize>,
}

impl Provenance {
    /// Banner for this run followed by the inputs' own comment blocks.
    pub fn render(&self, inherited: &[&str]) -> String {
        let mut out = String::new();
        match &self.outfile {
            Some(path) => out.push_str(&centered(&format!(" {} ", path.display()))),
            None => out.push_str(&"#".repeat(WIDTH)),
        }
        out.push('\n');
        out.push_str(&format!("# {}\n", env!("CARGO_PKG_NAME")));

        for (idx, infile) in self.infiles.iter().enumerate() {
            if idx == 0 {
                out.push_str(&format!("#     infile={}\n", infile.display()));
            } else {
                out.push_str(&format!("#            {}\n", infile.display()));
            }
        }
        let outfile = self.outfile.as_ref().map(|p| p.display().to_string());
        push_option(&mut out, "outfile", Some(outfile.as_deref().unwrap_or("<stdout>")));
        push_option(&mut out, "user", self.user.as_deref());
        push_option(&mut out, "language", self.language.as_deref());
        push_option(&mut out, "query", self.query.as_deref());
        push_option(&mut out, "since", self.since.as_deref());
        push_option(&mut out, "until", self.until.as_deref());
        if self.force {
            out.push_str("#     force\n");
        }
        if let Some(number) = self.number {
            out.push_str(&format!("#     number={number}\n"));
        }
        out.push_str(&"#".repeat(WIDTH));
        out.push('\n');

        for block in inherited {
            out.push_str(block);
        }
        out
    }
}

fn push_option(out: &mut String, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        out.push_str(&format!("#     {key}={value}\n"));
    }
}

fn centered(title: &str) -> String {
    let len = title.chars().count();
    if len >= WIDTH {
        return title.to_string();
    }
    let left = (WIDTH - len) / 2;
    let right = WIDTH - len - left;
    format!("{}{title}{}", "#".repeat(left), "#".repeat(right))
}
