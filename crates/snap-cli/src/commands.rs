use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use tracing::debug;

use snap_sdk::{FeedConfig, FeedWatch, MemoryImage, NewPost, Post, Snapline, StaticAuth, User, UserId};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Config(args) => cmd_config(args),
        Command::Demo(args) => cmd_demo(args).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<FeedConfig> {
    match path {
        Some(path) => FeedConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(FeedConfig::default()),
    }
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    if let Some(path) = &args.init {
        write_default_config(path)?;
        println!("{} Wrote default configuration to {}", "✓".green().bold(), path.display());
        return Ok(());
    }
    let config = load_config(args.file.as_deref())?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn write_default_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    let text = FeedConfig::default().to_toml_string()?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn user(id: &str) -> anyhow::Result<User> {
    Ok(User::new(UserId::new(id)?, id, format!("{id}@example.com")))
}

fn print_feed(watch: &mut FeedWatch) {
    let Some(posts) = watch.latest() else {
        return;
    };
    println!("  {} {} post(s)", "feed:".cyan(), posts.len());
    for post in &posts {
        print_post(post);
    }
}

fn print_post(post: &Post) {
    println!(
        "    {} {} ({} likes, {} comments)",
        post.created_date.to_rfc3339().dimmed(),
        post.title.bold(),
        post.likes,
        post.comments_quantity
    );
}

async fn cmd_demo(args: DemoArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    debug!(posts = args.posts, ?config, "starting demo");
    let app = Snapline::in_memory(config)?;
    let photo = MemoryImage::new("photo.jpg", &b"demo-photo"[..]);

    println!("{}", "Seeding another user's post".bold());
    app.sign_in(&StaticAuth::signed_in(user("bob")?)).await?;
    let bobs = app.create_post(NewPost::new(&photo, "Bob's harbour")).await?;
    app.add_comment(&bobs.id, "first light").await?;

    let me = app.sign_in(&StaticAuth::signed_in(user("alice")?)).await?;
    println!("{} Signed in as {}", "✓".green().bold(), me.login.yellow());
    let mut feed = app.open_profile_feed().await?;
    print_feed(&mut feed);

    let mut mine = Vec::with_capacity(args.posts);
    for i in 1..=args.posts {
        let post = app.create_post(NewPost::new(&photo, format!("Post #{i}"))).await?;
        app.add_comment(&post.id, "my own comment").await?;
        mine.push(post);
    }
    app.add_comment(&bobs.id, "lovely shot").await?;
    print_feed(&mut feed);

    println!("{}", "Changing avatar".bold());
    let avatar = MemoryImage::new("img1.png", &b"demo-avatar"[..]);
    let url = app.set_avatar(Some(&avatar)).await?;
    println!("  {} {}", "avatar:".cyan(), url.blue());
    let mut updated = 0;
    for post in mine.iter().map(|p| &p.id).chain(std::iter::once(&bobs.id)) {
        updated += app
            .comments(post)
            .await?
            .iter()
            .filter(|c| c.author_id == me.id && c.avatar.as_deref() == Some(url.as_str()))
            .count();
    }
    println!("  {} {} comment(s) carry the new avatar", "fan-out:".cyan(), updated);

    if let Some(post) = mine.first() {
        println!("{}", "Liking".bold());
        // Both likes are computed from the same copy of the post.
        for _ in 0..2 {
            match app.like(post).await? {
                Some(likes) => println!("  {} {likes}", "likes:".cyan()),
                None => println!("  {} like not recorded", "✗".red()),
            }
        }
        print_feed(&mut feed);
    }

    println!("{}", "Removing avatar".bold());
    let url = app.remove_avatar().await?;
    println!("  {} {}", "avatar:".cyan(), url.blue());

    if let Some(user) = app.sign_out() {
        println!("{} Signed out {}", "✓".green().bold(), user.login.yellow());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapline.toml");
        write_default_config(&path).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), FeedConfig::default());
        assert!(write_default_config(&path).is_err());
    }

    #[tokio::test]
    async fn demo_runs_end_to_end() {
        cmd_demo(DemoArgs {
            config: None,
            posts: 2,
        })
        .await
        .unwrap();
    }
}
