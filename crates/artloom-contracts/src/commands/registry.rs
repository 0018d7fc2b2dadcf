#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const STYLE_COMMAND: CommandSpec = CommandSpec {
    command: "style",
    action: "set_style",
};

pub(crate) const IMAGE_ID_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "favorite",
        action: "toggle_favorite",
    },
    CommandSpec {
        command: "fav",
        action: "toggle_favorite",
    },
    CommandSpec {
        command: "delete",
        action: "delete",
    },
    CommandSpec {
        command: "regenerate",
        action: "regenerate",
    },
];

pub(crate) const DOWNLOAD_COMMAND: CommandSpec = CommandSpec {
    command: "download",
    action: "download",
};

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "styles",
        action: "list_styles",
    },
    CommandSpec {
        command: "surprise",
        action: "surprise",
    },
    CommandSpec {
        command: "history",
        action: "history",
    },
    CommandSpec {
        command: "favorites",
        action: "favorites",
    },
    CommandSpec {
        command: "clear_history",
        action: "clear_history",
    },
    CommandSpec {
        command: "clear_favorites",
        action: "clear_favorites",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const STUDIO_HELP_COMMANDS: &[&str] = &[
    "/style <id>",
    "/styles",
    "/surprise",
    "/history",
    "/favorites",
    "/favorite <id>",
    "/delete <id>",
    "/regenerate <id>",
    "/download <id> [path]",
    "/clear_history",
    "/clear_favorites",
    "/status",
    "/help",
    "/quit",
];
