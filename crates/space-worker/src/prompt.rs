/// Build the prompt handed to `spawn` for a mentioned identity, per spec
/// §4.6: the spawned agent receives enough context to act on the mention
/// without re-reading the whole channel.
pub fn spawn_from_mention(identity: &str, channel_name: &str, content: &str) -> String {
    format!(
        "You are {identity}. You were mentioned in channel #{channel_name}:\n\n{content}\n\n\
         Respond to the mention. Your reply will be posted back to #{channel_name}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_identity_channel_and_content() {
        let prompt = spawn_from_mention("zealot-2", "incident-42", "@zealot-2 please look");
        assert!(prompt.contains("zealot-2"));
        assert!(prompt.contains("incident-42"));
        assert!(prompt.contains("please look"));
    }
}
