use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::{env, fs};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gitplumb::object::{encode, split_header};
use gitplumb::repository::DEFAULT_GITDIR;
use gitplumb::{Commit, GitObject, Object, ObjectId, ObjectType, Repository, Signature, Tree};
use log::debug;

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a repository
    ///
    /// The path defaults to the directory the init command is invoked in
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Prints the contents, type or size of an object (uncompressed and without the header)
    CatFile {
        #[command(flatten)]
        show: CatFileMode,
        object: String,
    },
    /// Computes the id of a file as an object, optionally storing it
    HashObject {
        /// Write the object into the object database
        #[arg(short = 'w')]
        write: bool,
        #[arg(short = 't', default_value = "blob")]
        object_type: ObjectType,
        file: PathBuf,
    },
    /// Lists the entries of a tree object
    LsTree {
        #[arg(long)]
        name_only: bool,
        tree: String,
    },
    /// Snapshots the working directory into tree objects and prints the root id
    WriteTree,
    /// Creates a commit object for a tree
    CommitTree {
        tree: String,
        #[arg(short = 'p')]
        parent: Option<String>,
        #[arg(short = 'm')]
        message: String,
        #[arg(long, env = "GIT_AUTHOR_NAME", default_value = "gitplumb")]
        author_name: String,
        #[arg(long, env = "GIT_AUTHOR_EMAIL", default_value = "gitplumb@localhost")]
        author_email: String,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct CatFileMode {
    /// Pretty-print the object's content
    #[arg(short = 'p')]
    pretty: bool,
    /// Show the object's type
    #[arg(short = 't')]
    object_type: bool,
    /// Show the object's payload size
    #[arg(short = 's')]
    size: bool,
}

/// Content-addressed object plumbing in the style of git
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Gitplumb {
    /// Object database root; defaults to .git in the current or a parent directory
    #[arg(long, global = true, env = "GIT_DIR")]
    git_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let gitplumb = Gitplumb::parse();
    debug!("{gitplumb:?}");

    match run(gitplumb) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(gitplumb: Gitplumb) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match gitplumb.cmd {
        Command::Init { path } => {
            fs::create_dir_all(&path)
                .with_context(|| format!("Could not create {}", path.display()))?;
            let gitdir = gitplumb.git_dir.unwrap_or_else(|| path.join(DEFAULT_GITDIR));
            let repository = Repository::init(&path, &gitdir)
                .context("An error occurred initializing the repository")?;
            writeln!(
                out,
                "Initialized empty repository in {}",
                repository.gitdir().display()
            )?;
        }
        Command::CatFile { show, object } => {
            let repository = open_repository(gitplumb.git_dir)?;
            let store = repository.objects();
            let id = store.resolve(&object)?;

            let data = store.get(&id)?;
            let (object_type, payload) = split_header(&data)?;
            if show.pretty {
                // Only trees need decoding; everything else prints as stored
                if object_type == ObjectType::Tree {
                    print_tree(&mut out, &Tree::deserialize(payload)?, false)?;
                } else {
                    out.write_all(payload)?;
                }
            } else if show.object_type {
                writeln!(out, "{object_type}")?;
            } else {
                writeln!(out, "{}", payload.len())?;
            }
        }
        Command::HashObject {
            write,
            object_type,
            file,
        } => {
            let data = fs::read(&file)
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            // Non-blob payloads must parse, but the id covers the bytes as given
            if object_type != ObjectType::Blob {
                GitObject::from_payload(object_type, &data)
                    .with_context(|| format!("{} is not a valid {object_type}", file.display()))?;
            }
            let encoded = encode(object_type, &data);

            let id = if write {
                let repository = open_repository(gitplumb.git_dir)?;
                repository.objects().put(&encoded)?
            } else {
                ObjectId::hash(&encoded)
            };
            writeln!(out, "{id}")?;
        }
        Command::LsTree { name_only, tree } => {
            let repository = open_repository(gitplumb.git_dir)?;
            let store = repository.objects();
            let id = store.resolve(&tree)?;
            let tree = store
                .read_as::<Tree>(&id)
                .with_context(|| format!("Not a tree object: {tree}"))?;
            print_tree(&mut out, &tree, name_only)?;
        }
        Command::WriteTree => {
            let repository = open_repository(gitplumb.git_dir)?;
            let id = repository.write_tree()?;
            writeln!(out, "{id}")?;
        }
        Command::CommitTree {
            tree,
            parent,
            message,
            author_name,
            author_email,
        } => {
            let repository = open_repository(gitplumb.git_dir)?;
            let store = repository.objects();

            let tree_id = store.resolve(&tree)?;
            store
                .read_as::<Tree>(&tree_id)
                .with_context(|| format!("Not a tree object: {tree}"))?;

            let parent_id = match parent {
                Some(parent) => {
                    let id = store.resolve(&parent)?;
                    store
                        .read_as::<Commit>(&id)
                        .with_context(|| format!("Not a commit object: {parent}"))?;
                    Some(id)
                }
                None => None,
            };

            let signature = Signature::now(author_name, author_email);
            let commit = Commit::builder()
                .tree(tree_id)
                .parent(parent_id)
                .author(signature.clone())
                .committer(signature)
                .message(&message)
                .build();

            let id = store.write_object(&commit)?;
            writeln!(out, "{id}")?;
        }
    };

    Ok(())
}

fn open_repository(git_dir: Option<PathBuf>) -> anyhow::Result<Repository> {
    let cwd = env::current_dir().context("Could not determine the current directory")?;
    let repository = match git_dir {
        Some(gitdir) => Repository::open(&cwd, &gitdir)?,
        None => Repository::discover(&cwd)?,
    };
    debug!("using gitdir {}", repository.gitdir().display());
    Ok(repository)
}

fn print_tree(out: &mut impl Write, tree: &Tree, name_only: bool) -> io::Result<()> {
    for entry in tree.entries() {
        if name_only {
            writeln!(out, "{}", entry.name)?;
        } else {
            writeln!(
                out,
                "{:0>6} {} {}\t{}",
                entry.mode.as_str(),
                entry.mode.object_type(),
                entry.id,
                entry.name
            )?;
        }
    }
    Ok(())
}
