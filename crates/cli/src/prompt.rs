//! Line-based stdin prompts.

use std::io::{IsTerminal, Write};

use anyhow::{Result, anyhow, bail};

/// Fail early when a prompt would block on a non-interactive stdin.
pub fn ensure_interactive(hint: &str) -> Result<()> {
    if std::io::stdin().is_terminal() {
        Ok(())
    } else {
        bail!("stdin is not a terminal; {hint}")
    }
}

pub fn prompt_required(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut stdout = std::io::stdout();
    match default {
        Some(value) if !value.trim().is_empty() => write!(stdout, "{prompt} [{value}]: ")?,
        _ => write!(stdout, "{prompt}: ")?,
    }
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return default
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("{prompt} is required"));
    }
    Ok(trimmed.to_string())
}

/// Like [`prompt_required`] but an empty answer is allowed.
pub fn prompt_optional(prompt: &str) -> Result<Option<String>> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{prompt}: ")?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

pub fn prompt_yes_no(prompt: &str, default_yes: bool) -> Result<bool> {
    loop {
        let default = if default_yes {
            "y"
        } else {
            "n"
        };
        let answer = prompt_required(
            &format!(
                "{prompt} [{}]",
                if default_yes {
                    "Y/n"
                } else {
                    "y/N"
                }
            ),
            Some(default),
        )?;
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Please answer with 'y' or 'n'."),
        }
    }
}

fn print_choices(title: &str, choices: &[String]) {
    println!("{title}");
    for (i, choice) in choices.iter().enumerate() {
        println!("  {:>2}) {choice}", i + 1);
    }
}

/// Pick exactly one entry; returns its index.
pub fn choose_one(title: &str, choices: &[String], default: usize) -> Result<usize> {
    if choices.is_empty() {
        bail!("nothing to choose from");
    }
    print_choices(title, choices);
    loop {
        let answer = prompt_required("Choice", Some(&(default + 1).to_string()))?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=choices.len()).contains(&n) => return Ok(n - 1),
            _ => println!("Enter a number between 1 and {}.", choices.len()),
        }
    }
}

/// Pick any number of entries; returns their indices in list order.
pub fn choose_many(title: &str, choices: &[String]) -> Result<Vec<usize>> {
    print_choices(title, choices);
    loop {
        let answer = prompt_optional("Select (e.g. 1,3 or 2-4, 'all', empty for none)")?;
        match parse_selection(answer.as_deref().unwrap_or(""), choices.len()) {
            Ok(picked) => return Ok(picked),
            Err(e) => println!("{e}"),
        }
    }
}

/// Parse `1,3`, `2-4`, `all` or an empty string into sorted, distinct
/// zero-based indices below `len`.
pub fn parse_selection(input: &str, len: usize) -> Result<Vec<usize>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") || input == "*" {
        return Ok((0..len).collect());
    }

    let mut picked = Vec::new();
    for part in input.split([',', ' ']).map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_index(a, len)?, parse_index(b, len)?),
            None => {
                let n = parse_index(part, len)?;
                (n, n)
            },
        };
        if start > end {
            bail!("invalid range '{part}'");
        }
        picked.extend(start..=end);
    }
    picked.sort_unstable();
    picked.dedup();
    Ok(picked)
}

fn parse_index(raw: &str, len: usize) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Ok(n - 1),
        _ => bail!("'{raw}' is not a number between 1 and {len}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn selection_accepts_lists_ranges_and_all() {
        assert_eq!(parse_selection("1,3", 4).unwrap(), vec![0, 2]);
        assert_eq!(parse_selection("2-4", 4).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_selection("3 1 3", 4).unwrap(), vec![0, 2]);
        assert_eq!(parse_selection("all", 3).unwrap(), vec![0, 1, 2]);
        assert!(parse_selection("", 3).unwrap().is_empty());
    }

    #[test]
    fn selection_rejects_out_of_range() {
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("3-1", 3).is_err());
        assert!(parse_selection("two", 3).is_err());
    }
}
