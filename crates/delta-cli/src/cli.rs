use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "delta",
    about = "Delta: a small content-addressed version control system",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new repository
    Init(InitArgs),
    /// Stage files (directories are walked)
    Add(AddArgs),
    /// Record the staged files as a commit
    Commit(CommitArgs),
    /// List branches, or create one
    Branch(BranchArgs),
    /// Point HEAD at another branch
    Checkout(CheckoutArgs),
    /// Show working-copy changes to a tracked file
    Diff(DiffArgs),
    /// List tracked files
    Tracked,
    /// Show commit history
    Log(LogArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    pub path: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CommitArgs {
    #[arg(short, long)]
    pub message: Option<String>,
    /// Message words, joined with spaces when `-m` is absent
    pub words: Vec<String>,
}

impl CommitArgs {
    pub fn message(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => self.words.join(" "),
        }
    }
}

#[derive(Args, Debug)]
pub struct BranchArgs {
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct CheckoutArgs {
    pub branch: String,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    pub path: String,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub oneline: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("delta").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn commit_message_from_flag_or_words() {
        let Command::Commit(args) = parse(&["commit", "-m", "first"]).command else {
            panic!("expected commit");
        };
        assert_eq!(args.message(), "first");

        let Command::Commit(args) = parse(&["commit", "fix", "the", "bug"]).command else {
            panic!("expected commit");
        };
        assert_eq!(args.message(), "fix the bug");
    }

    #[test]
    fn global_flags_anywhere() {
        let cli = parse(&["log", "-n", "3", "--oneline", "--verbose", "--format", "json"]);
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Log(args) = cli.command else {
            panic!("expected log");
        };
        assert_eq!(args.limit, Some(3));
        assert!(args.oneline);
    }

    #[test]
    fn defaults() {
        let cli = parse(&["tracked"]);
        assert!(!cli.verbose);
        assert_eq!(cli.format, OutputFormat::Text);

        let Command::Init(args) = parse(&["init"]).command else {
            panic!("expected init");
        };
        assert!(args.path.is_none());
    }

    #[test]
    fn add_requires_paths() {
        assert!(Cli::try_parse_from(["delta", "add"]).is_err());
        let Command::Add(args) = parse(&["add", "a.txt", "src"]).command else {
            panic!("expected add");
        };
        assert_eq!(args.paths, ["a.txt", "src"]);
    }

    #[test]
    fn checkout_and_diff_take_one_argument() {
        assert!(Cli::try_parse_from(["delta", "checkout"]).is_err());
        assert!(Cli::try_parse_from(["delta", "diff"]).is_err());
        assert!(matches!(
            parse(&["checkout", "dev"]).command,
            Command::Checkout(CheckoutArgs { branch }) if branch == "dev"
        ));
    }

    #[test]
    fn unknown_format_rejected() {
        assert!(Cli::try_parse_from(["delta", "tracked", "--format", "xml"]).is_err());
    }
}
