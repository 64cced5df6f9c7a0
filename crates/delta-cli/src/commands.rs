use std::path::PathBuf;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use delta_sdk::{DiffLine, LogEntry, Repository};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(args, format),
        Command::Add(args) => cmd_add(args, format),
        Command::Commit(args) => cmd_commit(args, format),
        Command::Branch(args) => cmd_branch(args, format),
        Command::Checkout(args) => cmd_checkout(args, format),
        Command::Diff(args) => cmd_diff(args, format),
        Command::Tracked => cmd_tracked(format),
        Command::Log(args) => cmd_log(args, format),
    }
}

fn cwd() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("cannot determine current directory")
}

fn open_repo() -> anyhow::Result<Repository> {
    Ok(Repository::discover(cwd()?)?)
}

fn print_json(value: serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_init(args: InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = match args.path {
        Some(path) => cwd()?.join(path),
        None => cwd()?,
    };
    std::fs::create_dir_all(&path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    let repo = Repository::init(&path)?;
    let branch = &repo.config().core.default_branch;

    match format {
        OutputFormat::Json => print_json(json!({
            "root": repo.root().display().to_string(),
            "branch": branch,
        })),
        OutputFormat::Text => {
            println!(
                "{} Initialized empty Delta repository in {}",
                "✓".green().bold(),
                repo.dir().display().to_string().bold()
            );
            println!("  Branch: {}", branch.yellow());
            Ok(())
        }
    }
}

fn cmd_add(args: AddArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let cwd = cwd()?;
    let paths: Vec<PathBuf> = args.paths.iter().map(|p| cwd.join(p)).collect();
    let staged = repo.add(&paths)?;

    match format {
        OutputFormat::Json => print_json(json!({ "staged": staged })),
        OutputFormat::Text => {
            for path in &staged {
                println!("  {} {}", "staged:".green(), path);
            }
            Ok(())
        }
    }
}

fn cmd_commit(args: CommitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let message = args.message();
    let id = repo.commit(&message)?;
    let branch = repo.current_branch()?.unwrap_or_default();

    match format {
        OutputFormat::Json => print_json(json!({
            "commit": id.to_hex(),
            "branch": branch,
            "message": message,
        })),
        OutputFormat::Text => {
            println!("[{} {}] {}", branch.green(), id.short_hex().yellow(), message);
            Ok(())
        }
    }
}

fn cmd_branch(args: BranchArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = open_repo()?;

    if let Some(name) = &args.name {
        repo.create_branch(name)?;
        return match format {
            OutputFormat::Json => print_json(json!({ "created": name })),
            OutputFormat::Text => {
                println!("Created branch {}", name.yellow());
                Ok(())
            }
        };
    }

    let current = repo.current_branch()?;
    let mut branches = repo.branches()?;
    // The current branch has no file until its first commit.
    if let Some(current) = &current {
        if !branches.contains(current) {
            branches.push(current.clone());
            branches.sort();
        }
    }

    match format {
        OutputFormat::Json => print_json(json!({ "current": current, "branches": branches })),
        OutputFormat::Text => {
            for branch in &branches {
                if current.as_deref() == Some(branch.as_str()) {
                    println!("* {}", branch.green().bold());
                } else {
                    println!("  {branch}");
                }
            }
            Ok(())
        }
    }
}

fn cmd_checkout(args: CheckoutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = open_repo()?;
    repo.checkout(&args.branch)?;

    match format {
        OutputFormat::Json => print_json(json!({ "branch": args.branch })),
        OutputFormat::Text => {
            println!("Switched to branch {}", args.branch.yellow().bold());
            Ok(())
        }
    }
}

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let path = cwd()?.join(&args.path);
    let diff = repo.diff(&path)?;

    match format {
        OutputFormat::Json => print_json(json!({
            "path": repo.relative_path(&path)?,
            "additions": diff.additions(),
            "deletions": diff.deletions(),
            "lines": diff.lines,
        })),
        OutputFormat::Text => {
            for line in &diff.lines {
                match line {
                    DiffLine::Unchanged(_) => println!("{line}"),
                    DiffLine::Added(_) => println!("{}", line.to_string().green()),
                    DiffLine::Removed(_) => println!("{}", line.to_string().red()),
                }
            }
            Ok(())
        }
    }
}

fn cmd_tracked(format: OutputFormat) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let tracked = repo.tracked()?;

    match format {
        OutputFormat::Json => print_json(json!({ "tracked": tracked })),
        OutputFormat::Text => {
            for path in &tracked {
                println!("{path}");
            }
            Ok(())
        }
    }
}

fn log_json(entry: &LogEntry) -> serde_json::Value {
    json!({
        "commit": entry.id.to_hex(),
        "tree": entry.commit.tree.to_hex(),
        "parent": entry.commit.parent.map(|p| p.to_hex()),
        "author": {
            "name": entry.commit.author.name,
            "email": entry.commit.author.email,
            "date": entry.commit.author.date,
        },
        "message": entry.commit.message,
    })
}

fn cmd_log(args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let entries = repo.log(args.limit)?;

    match format {
        OutputFormat::Json => print_json(entries.iter().map(log_json).collect()),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No commits yet.");
            }
            for entry in &entries {
                let first_line = entry.commit.message.lines().next().unwrap_or("");
                if args.oneline {
                    println!("{} {}", entry.id.short_hex().yellow(), first_line);
                    continue;
                }
                let author = &entry.commit.author;
                println!("{} {}", "commit".yellow(), entry.id.to_hex().yellow());
                println!("Author: {} <{}>", author.name, author.email);
                println!("Date:   {}", author.date.dimmed());
                println!();
                for line in entry.commit.message.lines() {
                    println!("    {line}");
                }
                println!();
            }
            Ok(())
        }
    }
}
