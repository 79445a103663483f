// Usage examples for the Teams MCP tools. Documentation only, nothing is invoked.

use serde_json::{json, Value};
use std::io::{self, Write};
use teams_mcp_core::console;

#[derive(Debug, Clone)]
pub struct UsageExample {
    pub name: &'static str,
    pub tool: &'static str,
    pub arguments: Value,
}

pub fn usage_examples() -> Vec<UsageExample> {
    vec![
        UsageExample {
            name: "List all teams",
            tool: "mcp_graph_teams_listTeams",
            arguments: json!({"user-id": "me"}),
        },
        UsageExample {
            name: "Get team details",
            tool: "mcp_graph_teams_getTeam",
            arguments: json!({"team-id": "YOUR_TEAM_ID"}),
        },
        UsageExample {
            name: "List channels in a team",
            tool: "mcp_graph_teams_listChannels",
            arguments: json!({"team-id": "YOUR_TEAM_ID"}),
        },
        UsageExample {
            name: "List messages in a channel",
            tool: "mcp_graph_teams_listChannelMessages",
            arguments: json!({
                "team-id": "YOUR_TEAM_ID",
                "channel-id": "YOUR_CHANNEL_ID",
                "$top": 10
            }),
        },
        UsageExample {
            name: "Post message to channel",
            tool: "mcp_graph_teams_postChannelMessage",
            arguments: json!({
                "team-id": "YOUR_TEAM_ID",
                "channel-id": "YOUR_CHANNEL_ID",
                "body": {"content": "Hello from MCP!"}
            }),
        },
        UsageExample {
            name: "List chats",
            tool: "mcp_graph_chat_listChats",
            arguments: json!({"$top": 10}),
        },
        UsageExample {
            name: "Send chat message",
            tool: "mcp_graph_chat_postMessage",
            arguments: json!({
                "chat-id": "YOUR_CHAT_ID",
                "body": {"content": "Hello!"}
            }),
        },
        UsageExample {
            name: "Create a new channel",
            tool: "mcp_graph_teams_createChannel",
            arguments: json!({
                "team-id": "YOUR_TEAM_ID",
                "displayName": "New Channel",
                "description": "Created via MCP",
                "membershipType": "standard"
            }),
        },
    ]
}

pub fn print_usage_examples(out: &mut dyn Write) -> io::Result<()> {
    console::section(out, "Usage Examples:")?;

    for (i, example) in usage_examples().iter().enumerate() {
        writeln!(out, "\n{}. {}", i + 1, example.name)?;
        writeln!(out, "   Tool: {}", example.tool)?;
        writeln!(out, "   Arguments: {}", example.arguments)?;
    }
    Ok(())
}
