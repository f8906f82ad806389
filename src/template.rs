//! Deterministic pattern engine used when no AI backend is involved.
//!
//! Every lookup below is an exhaustive `match` over the selector enums, so a
//! new craft, item or difficulty does not compile until each table has an
//! answer for it.

use crate::config::StitchCounts;
use crate::models::{
    Abbreviation, Craft, Difficulty, GenerationRequest, Item, Pattern, Phase, PHASE_BODY, PHASE_FINISHING, PHASE_SETUP,
};

const FALLBACK_YARN: &str = "quality wool";

const TIPS: [&str; 3] = [
    "If the fabric comes out too stiff, move up half a needle or hook size.",
    "Knitting a 10x10 cm gauge swatch is never wasted time, it saves you from ripping out later.",
    "On scarves keep the tension even so the edges do not curl.",
];

const FINISHING: [&str; 4] = [
    "Bind off (or fasten off) loosely so the edge keeps its stretch.",
    "Leave a tail of about 15 cm and cut the yarn.",
    "Weave in all ends with a tapestry needle, working through the back of the fabric.",
    "Block the piece for a crisp, professional finish.",
];

// Generic body text for items without a bespoke instruction set.
const GENERIC_BODY: [&str; 2] = [
    "Continue in your chosen stitch pattern until the piece reaches the desired size.",
    "Count your stitches at the end of every row.",
];
const GENERIC_CLOSER: &str = "Keep a steady, even rhythm all the way through.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    Short,
    Long,
}

impl TimeBucket {
    pub fn estimate(self) -> &'static str {
        match self {
            TimeBucket::Short => "3-6 hours",
            TimeBucket::Long => "15-20 hours",
        }
    }
}

pub fn item_name(item: Item) -> &'static str {
    match item {
        Item::Scarf => "scarf",
        Item::Vest => "vest",
        Item::Kippah => "kippah",
        Item::Basket => "storage basket",
        Item::Beanie => "beanie",
        Item::Blanket => "blanket",
    }
}

pub fn craft_phrase(craft: Craft) -> &'static str {
    match craft {
        Craft::Knitting => "two-needle knitting",
        Craft::Crochet => "single-hook crochet",
    }
}

pub fn difficulty_label(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Beginner => "Beginner",
        Difficulty::Intermediate => "Intermediate",
        Difficulty::Advanced => "Advanced",
    }
}

pub fn time_bucket(item: Item) -> TimeBucket {
    match item {
        Item::Scarf | Item::Vest | Item::Kippah | Item::Basket | Item::Beanie => TimeBucket::Short,
        Item::Blanket => TimeBucket::Long,
    }
}

fn yarn_grams(item: Item) -> u32 {
    match item {
        Item::Blanket => 800,
        Item::Scarf | Item::Vest | Item::Kippah | Item::Basket | Item::Beanie => 200,
    }
}

fn extra_materials(item: Item) -> &'static [&'static str] {
    match item {
        Item::Basket => &["Cotton cord or T-shirt yarn for stability"],
        Item::Scarf | Item::Vest | Item::Kippah | Item::Beanie | Item::Blanket => &[],
    }
}

fn main_tool(craft: Craft) -> &'static str {
    match craft {
        Craft::Knitting => "4.5 mm knitting needles",
        Craft::Crochet => "4 mm crochet hook",
    }
}

fn craft_abbreviation(craft: Craft) -> (&'static str, &'static str) {
    match craft {
        Craft::Knitting => ("k", "knit stitch"),
        Craft::Crochet => ("hdc", "half double crochet"),
    }
}

// Advanced scarves trade the slipped edge for a cable row.
fn scarf_edge(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Beginner | Difficulty::Intermediate => "Slip the first stitch of every row to keep the edges neat.",
        Difficulty::Advanced => "Work a cable cross every 10 rows along the length of the scarf.",
    }
}

fn scarf_texture(craft: Craft, difficulty: Difficulty) -> &'static str {
    match (craft, difficulty) {
        (Craft::Knitting, Difficulty::Beginner) => "Knit every stitch of every row (garter stitch) for a simple single-stitch texture.",
        (Craft::Crochet, Difficulty::Beginner) => "Work half double crochet into every stitch for a simple single-stitch texture.",
        (Craft::Knitting, Difficulty::Intermediate | Difficulty::Advanced) => {
            "Alternate knit and purl stitches (1x1 rib) to build a combined texture."
        }
        (Craft::Crochet, Difficulty::Intermediate | Difficulty::Advanced) => {
            "Alternate half double and double crochet across the row to build a combined texture."
        }
    }
}

/// Pure template generator. Holds only its configured constants.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    counts: StitchCounts,
}

impl TemplateEngine {
    pub fn new(counts: StitchCounts) -> Self {
        Self { counts }
    }

    pub fn generate(&self, request: &GenerationRequest) -> Pattern {
        let item = item_name(request.item);
        let craft = craft_phrase(request.craft);
        let label = difficulty_label(request.difficulty);

        let mut description = format!(
            "Professional {}-level instructions for a {item} worked in {craft}.",
            label.to_lowercase()
        );
        if let Some(notes) = request.notes() {
            description.push_str(&format!(" Special focus: {notes}"));
        }

        Pattern {
            title: format!("Designer {item} in {craft}"),
            description,
            difficulty: label.to_string(),
            time_estimate: time_bucket(request.item).estimate().to_string(),
            materials: self.materials(request),
            tools: vec![
                main_tool(request.craft).to_string(),
                "Stitch markers".to_string(),
                "Measuring tape".to_string(),
            ],
            abbreviations: self.abbreviations(request.craft),
            steps: vec![self.setup(request), self.body(request), finishing()],
            tips: TIPS.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn materials(&self, request: &GenerationRequest) -> Vec<String> {
        let yarn = request.yarn().unwrap_or(FALLBACK_YARN);
        let mut materials = vec![
            format!("{yarn} yarn (about {} g)", yarn_grams(request.item)),
            "Scissors".to_string(),
            "Tapestry needle for finishing".to_string(),
        ];
        materials.extend(extra_materials(request.item).iter().map(|m| m.to_string()));
        materials
    }

    fn abbreviations(&self, craft: Craft) -> Vec<Abbreviation> {
        let (term, explanation) = craft_abbreviation(craft);
        [("st", "stitch"), ("R", "row"), (term, explanation)]
            .into_iter()
            .map(|(term, explanation)| Abbreviation { term: term.to_string(), explanation: explanation.to_string() })
            .collect()
    }

    fn setup(&self, request: &GenerationRequest) -> Phase {
        let count = self.counts.for_request(request.craft, request.difficulty);
        let start = match request.craft {
            Craft::Knitting => format!("Cast on {count} stitches onto your needles."),
            Craft::Crochet => format!("Make a magic ring or a foundation chain of {count} stitches."),
        };
        Phase {
            phase: PHASE_SETUP.to_string(),
            instructions: vec![start, "Keep the tension even, not too tight, through the first row.".to_string()],
        }
    }

    fn body(&self, request: &GenerationRequest) -> Phase {
        let instructions: Vec<String> = match request.item {
            Item::Scarf => vec![
                scarf_texture(request.craft, request.difficulty).to_string(),
                "Continue working straight until the scarf measures about 150 cm.".to_string(),
                scarf_edge(request.difficulty).to_string(),
            ],
            Item::Kippah => vec![
                "Work in rounds, adding 6-8 stitches on every second round to keep the piece flat.".to_string(),
                "Stop increasing once the diameter reaches 12 cm.".to_string(),
                "Work 3 more rounds without increases for a gentle cupped shape.".to_string(),
            ],
            Item::Vest => vec![
                "Work the back as a straight rectangle up to the waist.".to_string(),
                "At the armholes, decrease 3 stitches on each side.".to_string(),
                "Work the front separately, shaping a V neckline.".to_string(),
            ],
            Item::Basket => vec![
                "Work a firm, flat foundation circle for the base.".to_string(),
                "Work the first round of the wall in the back loop only (BLO) to turn a sharp corner.".to_string(),
                "Keep working upward without increases until the basket is tall enough.".to_string(),
            ],
            Item::Beanie | Item::Blanket => generic_body(request.notes()),
        };
        Phase { phase: PHASE_BODY.to_string(), instructions }
    }
}

fn generic_body(notes: Option<&str>) -> Vec<String> {
    let closer = match notes {
        Some(notes) => format!("Keep the special request in mind: {notes}"),
        None => GENERIC_CLOSER.to_string(),
    };
    GENERIC_BODY.iter().map(|s| s.to_string()).chain(std::iter::once(closer)).collect()
}

fn finishing() -> Phase {
    Phase {
        phase: PHASE_FINISHING.to_string(),
        instructions: FINISHING.iter().map(|s| s.to_string()).collect(),
    }
}
