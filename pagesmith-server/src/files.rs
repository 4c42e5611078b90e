//! Supporting files committed next to the generated document.

use chrono::{DateTime, Datelike, Utc};

use crate::task::Round;

/// MIT license text for `holder`.
pub fn license(holder: &str, now: DateTime<Utc>) -> String {
    format!(
        r#"MIT License

Copyright (c) {year} {holder}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
"#,
        year = now.year(),
    )
}

/// README describing the generated application.
pub fn readme(task: &str, brief: &str, round: Round, now: DateTime<Utc>) -> String {
    format!(
        r#"# {task}

## Summary
This web application was generated to fulfill the following requirement:

{brief}

## Setup
This is a static web application that requires no installation. Open `index.html` in a web browser.

## Usage
1. Clone this repository
2. Open `index.html` in your web browser
3. The application is ready to use

## Code Explanation
The application is a single HTML file containing:
- **HTML structure**: the markup and content
- **CSS styling**: embedded styles for visual presentation
- **JavaScript logic**: client-side behaviour and interactivity

## Deployment
The application is deployed with GitHub Pages from the `main` branch.

## License
This project is licensed under the MIT License - see the LICENSE file for details.

---
*Generated on {date} - Round {round}*
"#,
        date = now.format("%Y-%m-%d"),
    )
}

/// Repository description: the brief on one line, cut to 100 characters.
/// GitHub rejects descriptions containing control characters.
pub fn description(brief: &str) -> String {
    let flat = brief
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("Web application: {}...", truncate(&flat, 100))
}

/// Cut `s` to at most `max` characters without splitting a code point.
pub fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
