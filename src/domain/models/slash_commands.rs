#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let mut args = text
            .trim()
            .split(' ')
            .filter(|e| return !e.is_empty())
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
        if args.is_empty() {
            return None;
        }
        let prefix = args[0].to_string();
        args.remove(0);

        let cmd = SlashCommand {
            command: prefix,
            args,
        };
        if cmd.is_quit()
            || cmd.is_help()
            || cmd.is_language_list()
            || cmd.is_language_set()
            || cmd.is_history()
            || cmd.is_load()
            || cmd.is_clear_history()
            || cmd.is_preview()
            || cmd.is_copy()
            || cmd.is_save()
            || cmd.is_improve()
            || cmd.is_abort()
        {
            return Some(cmd);
        }

        return None;
    }

    /// Arguments joined back into the free text they were typed as.
    pub fn text(&self) -> String {
        return self.args.join(" ");
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/?", "/help"].contains(&self.command.as_str());
    }

    pub fn is_language_list(&self) -> bool {
        return ["/ls", "/languages"].contains(&self.command.as_str());
    }

    pub fn is_language_set(&self) -> bool {
        return ["/l", "/lang", "/language"].contains(&self.command.as_str());
    }

    pub fn is_history(&self) -> bool {
        return ["/h", "/history"].contains(&self.command.as_str());
    }

    pub fn is_load(&self) -> bool {
        return ["/o", "/load"].contains(&self.command.as_str());
    }

    pub fn is_clear_history(&self) -> bool {
        return ["/clear"].contains(&self.command.as_str());
    }

    pub fn is_preview(&self) -> bool {
        return ["/p", "/preview"].contains(&self.command.as_str());
    }

    pub fn is_copy(&self) -> bool {
        return ["/c", "/copy"].contains(&self.command.as_str());
    }

    pub fn is_save(&self) -> bool {
        return ["/s", "/save"].contains(&self.command.as_str());
    }

    pub fn is_improve(&self) -> bool {
        return ["/i", "/improve"].contains(&self.command.as_str());
    }

    pub fn is_abort(&self) -> bool {
        return ["/a", "/abort"].contains(&self.command.as_str());
    }
}
