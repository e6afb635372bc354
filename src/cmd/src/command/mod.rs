use chrono::DateTime;
use chrono::Utc;
use clap::Subcommand;
use mixpanel::Mixpanel;
use mixpanel::Properties;
use mixpanel::Timestamp;
use serde_json::Value;

use crate::error::Result;

pub mod event;
pub mod identity;
pub mod profile;

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Track an event
    Track(event::EventArgs),
    /// Import a historical event
    Import(event::EventArgs),
    /// Update a user profile
    Engage(profile::ProfileArgs),
    /// Update a group profile
    Group(profile::GroupArgs),
    /// Alias a distinct id
    Alias(identity::AliasArgs),
    /// Link an anonymous id to an identified user
    Identify(identity::IdentifyArgs),
}

pub async fn run(mp: &dyn Mixpanel, cmd: &Command) -> Result<()> {
    match cmd {
        Command::Track(args) => event::track(mp, args).await,
        Command::Import(args) => event::import(mp, args).await,
        Command::Engage(args) => profile::engage(mp, args).await,
        Command::Group(args) => profile::group(mp, args).await,
        Command::Alias(args) => identity::alias(mp, args).await,
        Command::Identify(args) => identity::identify(mp, args).await,
    }
}

fn properties(props: &[(String, Value)]) -> Properties {
    props.iter().cloned().collect()
}

fn timestamp(time: Option<DateTime<Utc>>, now: bool, ignore_time: bool) -> Timestamp {
    match (time, now, ignore_time) {
        (_, _, true) => Timestamp::Ignore,
        (Some(ts), _, _) => Timestamp::Explicit(ts),
        (None, true, _) => Timestamp::Now,
        (None, false, _) => Timestamp::Unspecified,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use mixpanel::Mock;
    use serde_json::json;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(subcommand)]
        cmd: Command,
    }

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(std::iter::once("mixpanel").chain(args.iter().copied()))
            .unwrap()
            .cmd
    }

    #[test]
    fn test_timestamp() {
        let ts = DateTime::from_timestamp(1_500_000_000, 0).unwrap();
        assert_eq!(timestamp(Some(ts), false, false), Timestamp::Explicit(ts));
        assert_eq!(timestamp(None, true, false), Timestamp::Now);
        assert_eq!(timestamp(Some(ts), false, true), Timestamp::Ignore);
        assert_eq!(timestamp(None, false, false), Timestamp::Unspecified);
    }

    #[tokio::test]
    async fn test_run_commands_against_mock() {
        let mock = Mock::new();

        let cmds = [
            parse(&["track", "13793", "Signed Up", "--prop", "Referred By=Friend"]),
            parse(&[
                "engage",
                "13793",
                "--prop",
                "Address=1313 Mockingbird Lane",
                "--ip",
                "0",
            ]),
            parse(&[
                "engage",
                "13793",
                "--operation",
                "$union",
                "--prop",
                "tags=[\"a\",\"b\"]",
            ]),
            parse(&["group", "company_id", "11", "--prop", "size=10"]),
            parse(&["alias", "13793", "bob"]),
        ];
        for cmd in &cmds {
            run(&mock, cmd).await.unwrap();
        }

        let people = mock.people("13793");
        assert_eq!(people.events.len(), 1);
        assert_eq!(people.events[0].name, "Signed Up");
        assert_eq!(people.properties["Address"], json!("1313 Mockingbird Lane"));
        assert_eq!(people.properties["tags"], json!(["a", "b"]));
        assert_eq!(people.aliases, vec!["bob".to_string()]);

        let group = mock.group("company_id", "11");
        assert_eq!(group.properties["size"], json!(10));
    }

    #[test]
    fn test_ignore_time_conflicts() {
        let try_parse = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("mixpanel").chain(args.iter().copied()))
        };

        assert!(try_parse(&["engage", "1", "--ignore-time", "--time", "1500000000"]).is_err());
        assert!(try_parse(&["engage", "1", "--ignore-time", "--now"]).is_err());
        assert!(try_parse(&["group", "org", "1", "--now", "--time", "1500000000"]).is_err());

        match parse(&["engage", "1", "--ignore-time"]) {
            Command::Engage(args) => assert!(args.update.ignore_time),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_operation_fails() {
        let mock = Mock::new();
        let cmd = parse(&["engage", "1", "--operation", "$add", "--prop", "n=1"]);
        assert!(run(&mock, &cmd).await.is_err());
    }
}
