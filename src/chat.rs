use tracing::{error, info};

use crate::{config::Latency, gemini::GeminiClient, models::ChatMessage, source::simulate_latency};

pub const GREETING: &str =
    "Hi! I'm the knitting guru. Stuck at some step? Not sure how to cast on? I'm here to help!";

const SYSTEM_PROMPT: &str = "You are a friendly expert in knitting and crochet. Answer briefly and practically, \
    in the language of the question. If a question is not about fibre crafts, steer back to them politely.";

const DEFAULT_REPLY: &str = "Great question! I'm running in demo mode right now, so my answers are limited, \
    but the pattern generator can build step-by-step instructions for you. Try asking about casting on, gauge, tension, hooks, yarn or finishing.";

// First matching rule wins.
const RULES: &[(&[&str], &str)] = &[
    (&["cast on", "cast-on", "foundation chain", "magic ring"],
        "For a stretchy start use the long-tail cast on when knitting, or a loose foundation chain (one hook size up) when crocheting."),
    (&["gauge", "swatch"],
        "Knit or crochet a 10x10 cm swatch in pattern, wash and dry it, then count stitches and rows. Too many stitches means go up a needle size."),
    (&["tension", "tight", "loose"],
        "Uneven tension usually comes from how the working yarn runs through your fingers. Wrap it once around your pinky and keep the stitches on the widest part of the needle."),
    (&["hook"],
        "A 4 mm hook suits most worsted yarns. Check the yarn band: the recommended hook size is printed right next to the gauge."),
    (&["yarn", "wool", "cotton"],
        "Beginners do best with a smooth, light-coloured worsted yarn, where every stitch is easy to see. Cotton is great for baskets, wool for anything warm."),
    (&["ends", "weave"],
        "Thread the tail on a tapestry needle and weave it diagonally through the back of the fabric for 3-4 cm, then back the other way before trimming."),
    (&["block", "blocking"],
        "Wet the finished piece, press out the water in a towel, pin it to shape and let it dry flat. Acrylic can be steam-blocked lightly instead."),
];

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect()
}

// A keyword matches a run of whole words, so "ends" never matches inside "friends".
fn mentions(message: &[&str], keyword: &str) -> bool {
    let keyword = words(keyword);
    !keyword.is_empty() && message.windows(keyword.len()).any(|run| run == keyword.as_slice())
}

/// Canned answer for a question, matched case-insensitively on keywords.
pub fn rule_based_reply(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    let message = words(&lower);
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| mentions(&message, k)))
        .map(|(_, reply)| *reply)
        .unwrap_or(DEFAULT_REPLY)
}

pub struct ChatGuru {
    gemini: Option<GeminiClient>,
    latency: Latency,
}

impl ChatGuru {
    pub fn new(gemini: Option<GeminiClient>, latency: Latency) -> Self {
        Self { gemini: gemini.filter(|c| !c.is_demo()), latency }
    }

    pub fn greeting(&self) -> ChatMessage {
        ChatMessage::model(GREETING)
    }

    pub async fn reply(&self, history: &[ChatMessage], message: &str) -> ChatMessage {
        if let Some(client) = &self.gemini {
            match client.chat(SYSTEM_PROMPT, history, message).await {
                Ok(text) if !text.is_empty() => {
                    info!("✅ Guru answered via Gemini ({} chars)", text.len());
                    return ChatMessage::model(text);
                }
                Ok(_) => error!("❌ Gemini returned an empty chat answer"),
                Err(e) => error!("❌ Guru chat failed: {}", e),
            }
            info!("🔄 Falling back to rule-based reply");
        } else {
            simulate_latency(self.latency).await;
        }
        ChatMessage::model(rule_based_reply(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatRole;
    use pretty_assertions::assert_eq;

    #[test]
    fn keywords_pick_their_reply() {
        assert!(rule_based_reply("How do I CAST ON for a scarf?").contains("long-tail"));
        assert!(rule_based_reply("why knit a swatch").contains("10x10"));
        assert!(rule_based_reply("my stitches are too tight").contains("tension"));
        assert!(rule_based_reply("which hook size?").contains("4 mm"));
        assert!(rule_based_reply("how to weave in ends").contains("tapestry"));
    }

    #[test]
    fn unknown_questions_get_the_default() {
        assert_eq!(rule_based_reply("what's the weather like?"), DEFAULT_REPLY);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(rule_based_reply("my friends recommends knitting"), DEFAULT_REPLY);
        assert_eq!(rule_based_reply("building blocks for kids"), DEFAULT_REPLY);
        assert_eq!(rule_based_reply("hooked on this hobby"), DEFAULT_REPLY);
        assert!(rule_based_reply("loose ends everywhere").contains("tension"));
        assert!(rule_based_reply("do I need blocking?").contains("pin it to shape"));
        assert!(rule_based_reply("what is a cast-on?").contains("long-tail"));
        assert!(rule_based_reply("weave in the ends, please").contains("tapestry"));
    }

    #[test]
    fn earlier_rules_win() {
        // "cast on" comes before "yarn" in the rule table
        assert!(rule_based_reply("which yarn should I cast on with").contains("long-tail"));
    }

    #[tokio::test]
    async fn demo_guru_answers_from_rules() {
        let guru = ChatGuru::new(
            Some(GeminiClient::new(crate::config::DEMO_KEY.into(), "http://127.0.0.1:9".into(), std::time::Duration::from_secs(1)).unwrap()),
            Latency::none(),
        );
        let reply = guru.reply(&[guru.greeting()], "how do I block a shawl?").await;
        assert_eq!(reply.role, ChatRole::Model);
        assert!(reply.text.contains("pin it to shape"));
    }

    #[test]
    fn greeting_comes_from_the_model() {
        let guru = ChatGuru::new(None, Latency::none());
        let greeting = guru.greeting();
        assert_eq!(greeting.role, ChatRole::Model);
        assert_eq!(greeting.text, GREETING);
    }
}
