// Prompt construction for NOA recommendations.
// Templates use `{placeholder}` markers that are filled with `str::replace`.

use crate::noa::models::{ChatMessage, Role};

/// Shared opening for both prompt modes.
const SPECIALIST_PREAMBLE: &str = "You are an expert HR specialist helping to recommend the \
correct Nature of Action (NOA) code for Federal employee personnel actions.";

/// Output format requested on the first pass.
const FIRST_PASS_FORMAT: &str = "\"Recommendation: NOA [code] – [label] | LAC: [authority code if applicable]. \
Clarifications: [question 1]? [question 2]? \
Required SF-50 fields: [field 1], [field 2], [and other relevant fields]. \
OPM NOA Remarks: [suggested remarks text for the SF-50 remarks field].\"";

/// Output format requested on follow-up turns. No clarifications section.
const FOLLOW_UP_FORMAT: &str = "\"Recommendation: NOA [code] – [label] | LAC: [authority code if applicable]. \
Required SF-50 fields: [field 1], [field 2], [and other relevant fields]. \
OPM NOA Remarks: [suggested remarks text for the SF-50 remarks field].\"";

/// First-pass template. Replace: {preamble}, {format}, {examples}, {scenario}
const FIRST_PASS_TEMPLATE: &str = r#"{preamble} Based on the employee scenario provided, recommend the appropriate NOA code, Legal Authority Code (LAC) if applicable, clarifications needed, required SF-50 fields, and suggested OPM NOA Remarks.

Your response must follow this exact format:
{format}

If LAC is not applicable or not needed, you may omit it. Always provide at least 2-3 clarifications and list the key SF-50 fields that must be completed. Provide suggested OPM NOA Remarks that are appropriate for the specific action type and can be used in the SF-50 remarks field.

Here are some examples:

{examples}

Now, analyze this scenario and provide your recommendation:

Instruction: {scenario}
Output:"#;

/// Follow-up template. Replace: {preamble}, {scenario}, {history}, {format}
const FOLLOW_UP_TEMPLATE: &str = r#"{preamble}

Original Scenario: {scenario}

Conversation History:
{history}

Based on the original scenario and the conversation above, provide an updated recommendation. Your response must follow this exact format:
{format}

If LAC is not applicable, you may omit it. Always list the key SF-50 fields that must be completed. Provide suggested OPM NOA Remarks that are appropriate for the specific action type.

Output:"#;

/// A worked instruction → output pair shown to the model.
#[derive(Debug, Clone, Copy)]
pub struct FewShotExample {
    pub instruction: &'static str,
    pub output: &'static str,
}

pub const FEW_SHOT_EXAMPLES: &[FewShotExample] = &[
    FewShotExample {
        instruction: "Employee is being permanently promoted from GS-12 step 5 to GS-13 step 1 after competitive selection.",
        output: "Recommendation: NOA 702 – Promotion | LAC: 5 CFR 335.103. Clarifications: Effective date? Competitive certificate number? Required SF-50 fields: Position title, pay plan, grade, step, duty station, service computation date, and prior position data. OPM NOA Remarks: Permanent promotion from GS-12 Step 5 to GS-13 Step 1 via competitive selection process.",
    },
    FewShotExample {
        instruction: "Employee is moving from one office to another within the same agency with no change in grade or duties.",
        output: "Recommendation: NOA 721 – Reassignment. Clarifications: Is this management-directed? Any change in FLSA or duty station? Required SF-50 fields: Old and new org codes, position title, duty station, grade/step unchanged. OPM NOA Remarks: Reassignment within same agency, no change in grade or duties.",
    },
    FewShotExample {
        instruction: "Employee is receiving a within-grade increase (WIGI) from step 2 to step 3.",
        output: "Recommendation: NOA 891 – Within-Grade Increase. LAC: 5 USC 5335. Clarifications: WIGI due date confirmed? Performance rating meets criteria? Required SF-50: Step before/after, effective date. OPM NOA Remarks: Within-grade increase from Step 2 to Step 3 per 5 USC 5335.",
    },
    FewShotExample {
        instruction: "Employee is converting from a term appointment to a permanent career appointment.",
        output: "Recommendation: NOA 508 – Conversion to Career. LAC: Reg 5 CFR 316. Clarifications: Was the conversion competitive or noncompetitive? Required SF-50: Tenure, position occupied, work schedule. OPM NOA Remarks: Conversion from term appointment to permanent career appointment per 5 CFR 316.",
    },
    FewShotExample {
        instruction: "Employee is going on a temporary promotion from GS-12 to GS-13 for 120 days.",
        output: "Recommendation: NOA 703 – Temporary Promotion. LAC: 5 CFR 335. Clarifications: End date? Has employee met time-in-grade? Required SF-50: Not-to-exceed date, grade/step, position title. OPM NOA Remarks: Temporary promotion from GS-12 to GS-13, not to exceed 120 days.",
    },
    FewShotExample {
        instruction: "Employee is retiring under regular FERS.",
        output: "Recommendation: NOA 302 – Retirement (Voluntary). Clarifications: Confirm retirement type. Required SF-50: Retirement code, SCD, FEHB/FEGLI remarks. OPM NOA Remarks: Voluntary retirement under FERS retirement system.",
    },
    FewShotExample {
        instruction: "Employee is receiving a quality step increase.",
        output: "Recommendation: NOA 892 – Quality Step Increase (QSI). LAC: 5 USC 5336. Clarifications: Performance rating? Required SF-50: Step increase, remarks. OPM NOA Remarks: Quality Step Increase awarded based on outstanding performance per 5 USC 5336.",
    },
    FewShotExample {
        instruction: "Employee's duty station is changing from DC to Baltimore.",
        output: "Recommendation: NOA 792 – Change in Duty Station. Clarifications: Telework status? Physical office location? Required SF-50: New duty station code. OPM NOA Remarks: Change in duty station from Washington, DC to Baltimore, MD.",
    },
];

/// Builds the first-pass prompt: task, format, worked examples, then the scenario.
pub fn build_first_pass_prompt(scenario: &str) -> String {
    FIRST_PASS_TEMPLATE
        .replace("{preamble}", SPECIALIST_PREAMBLE)
        .replace("{format}", FIRST_PASS_FORMAT)
        .replace("{examples}", &render_examples(FEW_SHOT_EXAMPLES))
        // Scenario last so user text is never scanned for placeholders.
        .replace("{scenario}", scenario)
}

/// Builds the follow-up prompt from the original scenario and the full turn history.
pub fn build_follow_up_prompt(scenario: &str, history: &[ChatMessage]) -> String {
    let format_filled = FOLLOW_UP_TEMPLATE
        .replace("{preamble}", SPECIALIST_PREAMBLE)
        .replace("{format}", FOLLOW_UP_FORMAT);

    // Split around the user-controlled slots so their contents are inserted verbatim.
    let (head, tail) = format_filled
        .split_once("{history}")
        .unwrap_or((format_filled.as_str(), ""));
    let head = head.replace("{scenario}", scenario);

    format!("{head}{}{tail}", render_history(history))
}

fn render_examples(examples: &[FewShotExample]) -> String {
    examples
        .iter()
        .enumerate()
        .map(|(i, ex)| {
            format!(
                "Example {}:\nInstruction: {}\nOutput: {}",
                i + 1,
                ex.instruction,
                ex.output
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|msg| match msg.role {
            Role::User => format!("User: {}", msg.content),
            Role::Assistant => format!("Assistant: {}", msg.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
