//! Long-running bot that answers group management commands.

use crate::broadcast::{BroadcastDispatcher, BroadcastReport};
use crate::command::{classify, route, CommandKind, Grammar, Route};
use crate::config::SignalConfig;
use crate::directory::{GroupDirectory, GroupSelector, MemberSelector};
use crate::error::{DirectoryError, TransportError};
use crate::permission::PermissionGate;
use crate::phone::PhoneNormalizer;
use crate::store::{GroupStore, Member};
use crate::transport::{InboundMessage, Transport};

/// Reply to `bot help`.
pub const HELP_TEXT: &str = "available commands (GROUPNAME may not contain any spaces):\n\n\
---> basic (everyone can send these commands to the bot):\n\n\
bot help\n\
bot subscribe <GROUPNAME> <PARTICIPANT NAME>\n\
bot unsubscribe <GROUPNAME>\n\n\
---> administrative (only select people can use these commands):\n\n\
bot listgroups\n\
bot addgroup <GROUPNAME>\n\
bot removegroup <GROUPNAME>\n\
bot list <GROUPNAME>\n\
bot add <GROUPNAME> <PARTICIPANT PHONE NUMBER WITHOUT SPACES> <PARTICIPANT NAME>\n\
bot remove <GROUPNAME> <PARTICIPANT NAME OR NUMBER>\n\
bot send <GROUPNAME> <SOME TEXT>\n\n\
---> examples:\n\n\
bot subscribe Testgroup Steven Miller\n\
bot addgroup Testgroup\n\
bot add Testgroup 017912345678 Some Dude\n\
bot send Testgroup This message should be sent!";

/// Shown in replies when a command carried no group name.
const NO_GROUP: &str = "<none>";

/// Minimum run of `+`/digits that makes a `remove` argument a phone number.
const MIN_PHONE_CHARS: usize = 6;

/// Processes inbound messages one at a time and replies to each.
pub struct BotController<S, T> {
    directory: GroupDirectory<S>,
    transport: T,
    gate: PermissionGate,
    normalizer: PhoneNormalizer,
    default_message: String,
}

impl<S: GroupStore, T: Transport> BotController<S, T> {
    pub fn new(
        directory: GroupDirectory<S>,
        transport: T,
        normalizer: PhoneNormalizer,
        gate: PermissionGate,
        default_message: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            transport,
            gate,
            normalizer,
            default_message: default_message.into(),
        }
    }

    /// Wire up a controller from the `signal` section of the configuration.
    pub fn from_config(store: S, transport: T, config: &SignalConfig) -> Self {
        let normalizer = PhoneNormalizer::new(&config.default_country_code);
        let gate = PermissionGate::new(normalizer.clone(), &config.admin_users);
        Self::new(
            GroupDirectory::new(store),
            transport,
            normalizer,
            gate,
            config.default_message.clone(),
        )
    }

    pub fn directory(&self) -> &GroupDirectory<S> {
        &self.directory
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Receive and answer messages until the transport closes.
    pub async fn run(&self) -> Result<(), TransportError> {
        tracing::info!(
            "Listening for commands on {} ({} admins configured)",
            self.transport.platform_name(),
            self.gate.len()
        );

        while let Some(message) = self.transport.receive().await? {
            self.process(&message).await;
        }

        tracing::info!("{} transport closed", self.transport.platform_name());
        Ok(())
    }

    /// Handle one message and send the reply back to its sender.
    pub async fn process(&self, message: &InboundMessage) {
        let reply = self.handle(message).await;
        if let Err(e) = self.transport.send(&message.source, &reply).await {
            tracing::warn!("Could not reply to {}: {}", message.source, e);
        }
    }

    /// Work out the reply for one message, executing its command if any.
    pub async fn handle(&self, message: &InboundMessage) -> String {
        let is_admin = self.gate.is_admin(&message.source);

        let Some(parsed) = classify(&message.text, is_admin) else {
            let administrative = route(&message.text)
                .is_some_and(|r| r.kind.grammar() == Grammar::Administrative);
            if administrative {
                tracing::info!(
                    "Ignoring administrative command from non-admin {}",
                    message.source
                );
            } else {
                tracing::debug!("Unmatched message from {}", message.source);
            }
            return self.default_message.clone();
        };

        self.execute(&message.source, parsed).await
    }

    async fn execute(&self, source: &str, route: Route) -> String {
        let group = route.group.as_deref();
        let remainder = route.remainder.as_deref();
        let selector = GroupSelector::from_token(group);

        let outcome = match route.kind {
            CommandKind::Help => Ok(HELP_TEXT.to_string()),
            CommandKind::Subscribe => self.subscribe(source, selector, remainder).await,
            CommandKind::Unsubscribe => self.unsubscribe(source, selector).await,
            CommandKind::ListGroups => self.list_groups().await,
            CommandKind::AddGroup => self.add_group(group).await,
            CommandKind::RemoveGroup => self.remove_group(selector).await,
            CommandKind::List => self.list(selector).await,
            CommandKind::Add => self.add(selector, remainder).await,
            CommandKind::Remove => self.remove(selector, remainder).await,
            CommandKind::Send => self.send(selector, remainder).await,
        };

        let group = group.unwrap_or(NO_GROUP);
        match outcome {
            Ok(reply) => {
                tracing::debug!("{} {}: called by {}", route.kind.keyword(), group, source);
                reply
            }
            Err(e) => {
                tracing::warn!(
                    "{} {}: called by {}, failed: {}",
                    route.kind.keyword(),
                    group,
                    source,
                    e
                );
                failure_reply(route.kind, group, &e)
            }
        }
    }

    async fn subscribe(
        &self,
        source: &str,
        selector: GroupSelector<'_>,
        name: Option<&str>,
    ) -> Result<String, DirectoryError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty()).ok_or_else(|| {
            DirectoryError::InvalidArgument(
                "you didn't supply your name after the groupname".to_string(),
            )
        })?;
        let phone = self.normalizer.normalize(source);

        let member = self
            .directory
            .add_member(selector, Some(&phone), Some(name))
            .await?;
        let group = self.directory.resolve_group(GroupSelector::id(member.group_id)).await?;

        Ok(format!(
            "added you ({} alias {}) to group {}",
            member.phone,
            member.display_name(),
            group.name
        ))
    }

    async fn unsubscribe(
        &self,
        source: &str,
        selector: GroupSelector<'_>,
    ) -> Result<String, DirectoryError> {
        let phone = self.normalizer.normalize(source);
        let (group, _) = self
            .directory
            .remove_member(selector, MemberSelector::phone(&phone))
            .await?;

        Ok(format!(
            "deleted you ({}) from group {} if you were a member",
            phone, group.name
        ))
    }

    async fn list_groups(&self) -> Result<String, DirectoryError> {
        let names: Vec<String> = self
            .directory
            .list_groups()
            .await?
            .into_iter()
            .map(|g| g.name)
            .collect();

        Ok(format!("available groups:\n\n{}", names.join(", ")))
    }

    async fn add_group(&self, name: Option<&str>) -> Result<String, DirectoryError> {
        let group = self.directory.add_group(name.unwrap_or_default()).await?;
        Ok(format!("group {} created", group.name))
    }

    async fn remove_group(&self, selector: GroupSelector<'_>) -> Result<String, DirectoryError> {
        let removed = self.directory.remove_group(selector).await?;
        Ok(format!(
            "group {} deleted including its {} members:\n\n{}",
            removed.group.name,
            removed.members.len(),
            member_lines(&removed.members)
        ))
    }

    async fn list(&self, selector: GroupSelector<'_>) -> Result<String, DirectoryError> {
        let group = self.directory.resolve_group(selector).await?;
        let members = self.directory.members_of(&group).await?;
        Ok(format!(
            "group {} consists of {} members:\n\n{}",
            group.name,
            members.len(),
            member_lines(&members)
        ))
    }

    async fn add(
        &self,
        selector: GroupSelector<'_>,
        remainder: Option<&str>,
    ) -> Result<String, DirectoryError> {
        let (phone, name) = match remainder {
            Some(rest) => match rest.split_once(char::is_whitespace) {
                Some((phone, name)) => (Some(phone), Some(name)),
                None => (Some(rest), None),
            },
            None => (None, None),
        };
        let phone = phone.map(|p| self.normalizer.normalize(p));

        let member = self
            .directory
            .add_member(selector, phone.as_deref(), name)
            .await?;
        let group = self.directory.resolve_group(GroupSelector::id(member.group_id)).await?;

        Ok(format!(
            "added {} {} to group {}",
            member.phone,
            member.display_name(),
            group.name
        ))
    }

    async fn remove(
        &self,
        selector: GroupSelector<'_>,
        target: Option<&str>,
    ) -> Result<String, DirectoryError> {
        let target = target.map(str::trim).unwrap_or_default();
        let phone;
        let member = if looks_like_phone(target) {
            phone = self.normalizer.normalize(target);
            MemberSelector::phone(&phone)
        } else if target.is_empty() {
            MemberSelector::default()
        } else {
            MemberSelector::name(target)
        };
        let shown = member.phone.or(member.name).unwrap_or_default().to_string();

        let (group, _) = self.directory.remove_member(selector, member).await?;
        Ok(format!(
            "deleted {} from group {} if the person was a member",
            shown, group.name
        ))
    }

    async fn send(
        &self,
        selector: GroupSelector<'_>,
        text: Option<&str>,
    ) -> Result<String, DirectoryError> {
        let group = self.directory.resolve_group(selector).await?;
        let members = self.directory.members_of(&group).await?;
        let text = text.unwrap_or_default();

        let report = BroadcastDispatcher::new(&self.transport)
            .broadcast(&group, members, text)
            .await?;

        Ok(format_report(&group.name, text, &report))
    }
}

/// Whether a `remove` argument should be read as a phone number.
fn looks_like_phone(target: &str) -> bool {
    target
        .chars()
        .take_while(|c| *c == '+' || c.is_ascii_digit())
        .count()
        >= MIN_PHONE_CHARS
}

fn member_lines(members: &[Member]) -> String {
    members
        .iter()
        .map(|m| format!("{} {}", m.phone, m.display_name()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_report(group: &str, text: &str, report: &BroadcastReport) -> String {
    let succeeded = report
        .succeeded
        .iter()
        .map(|m| format!("{} ({})", m.display_name(), m.phone))
        .collect::<Vec<_>>()
        .join("\n");
    let failed = report
        .failed
        .iter()
        .map(|(m, e)| format!("{} ({}): {}", m.display_name(), m.phone, e))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "message to group {}:\n\n{}\n\nsuccessfully sent to:\n\n{}\n\nproblems while sending to:\n\n{}",
        group, text, succeeded, failed
    )
}

fn failure_reply(kind: CommandKind, group: &str, error: &DirectoryError) -> String {
    match kind {
        CommandKind::Help => format!("could not show help: {}", error),
        CommandKind::Subscribe => format!("could not add you to {}: {}", group, error),
        CommandKind::Unsubscribe => format!("could not delete you from {}: {}", group, error),
        CommandKind::ListGroups => format!("could not list groups: {}", error),
        CommandKind::AddGroup => format!("could not create group {}: {}", group, error),
        CommandKind::RemoveGroup => format!("could not delete group {}: {}", group, error),
        CommandKind::List => format!("could not list group {}: {}", group, error),
        CommandKind::Add => format!("could not add to group {}: {}", group, error),
        CommandKind::Remove => format!("could not delete from group {}: {}", group, error),
        CommandKind::Send => format!("could not send message to group {}: {}", group, error),
    }
}
