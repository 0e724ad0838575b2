//! Keyword-based symptom assessment.
//!
//! Detects symptoms in a free-text message, grades severity, builds a care
//! plan and composes the reply text. General guidance only.

use std::collections::BTreeSet;

use serde::Serialize;

use healthbot_core::Severity;

/// Messages up to this many characters are quoted back in the reply.
const ECHO_LIMIT: usize = 140;

const NO_SYMPTOMS_REPLY: &str = "I didn’t detect specific symptoms. Could you share duration, fever, \
pain location, or triggers? Meanwhile, rest, hydrate, and avoid heavy meals. If chest pain, \
trouble breathing, severe weakness, or symptoms >72 hours, please see a clinician.";

const DEHYDRATION_RISK: &str = "Risk of dehydration";

/// Trim and collapse every whitespace run to a single space.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// Symptoms
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symptom {
    Fever,
    Cough,
    Cold,
    Headache,
    SoreThroat,
    BodyPain,
    Stomach,
    Vomiting,
    Diarrhea,
    Breathlessness,
    ChestPain,
    Injury,
}

impl Symptom {
    pub const ALL: [Symptom; 12] = [
        Symptom::Fever,
        Symptom::Cough,
        Symptom::Cold,
        Symptom::Headache,
        Symptom::SoreThroat,
        Symptom::BodyPain,
        Symptom::Stomach,
        Symptom::Vomiting,
        Symptom::Diarrhea,
        Symptom::Breathlessness,
        Symptom::ChestPain,
        Symptom::Injury,
    ];

    /// Lowercase phrases that indicate this symptom.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Symptom::Fever => &["fever", "temperature", "high temp"],
            Symptom::Cough => &["cough", "coughing"],
            Symptom::Cold => &["cold", "runny nose", "sneezing"],
            Symptom::Headache => &["headache", "migraine", "head pain"],
            Symptom::SoreThroat => &["sore throat", "throat pain"],
            Symptom::BodyPain => &["body pain", "body ache", "muscle pain", "myalgia"],
            Symptom::Stomach => &["stomach", "abdomen", "abdominal", "belly", "gastric"],
            Symptom::Vomiting => &["vomit", "vomiting", "throwing up", "nausea"],
            Symptom::Diarrhea => &["diarrhea", "loose motion", "loose motions"],
            Symptom::Breathlessness => {
                &["shortness of breath", "breathless", "breathing trouble"]
            }
            Symptom::ChestPain => &["chest pain", "tightness in chest"],
            Symptom::Injury => &["injury", "sprain", "fracture", "cut", "wound"],
        }
    }
}

/// The symptoms mentioned in one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symptoms(BTreeSet<Symptom>);

impl Symptoms {
    /// Substring match of every keyword against the lowercased text.
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self(
            Symptom::ALL
                .into_iter()
                .filter(|s| s.keywords().iter().any(|k| lower.contains(k)))
                .collect(),
        )
    }

    pub fn has(&self, symptom: Symptom) -> bool {
        self.0.contains(&symptom)
    }

    fn any(&self, symptoms: &[Symptom]) -> bool {
        symptoms.iter().any(|s| self.has(*s))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Symptom> + '_ {
        self.0.iter().copied()
    }
}

// =============================================================================
// Severity
// =============================================================================

fn raise_to_moderate(severity: &mut Severity) {
    if *severity != Severity::Urgent {
        *severity = Severity::Moderate;
    }
}

/// Grade the symptoms and list the warning signs found.
///
/// Breathing trouble or chest pain is urgent; dehydration risk, fever with
/// aches, or an injury is moderate; anything else is low.
pub fn assess_severity(symptoms: &Symptoms) -> (Severity, Vec<&'static str>) {
    let mut red_flags = Vec::new();
    let mut severity = Severity::Low;

    if symptoms.any(&[Symptom::Breathlessness, Symptom::ChestPain]) {
        severity = Severity::Urgent;
        if symptoms.has(Symptom::Breathlessness) {
            red_flags.push("Shortness of breath");
        }
        if symptoms.has(Symptom::ChestPain) {
            red_flags.push("Chest pain");
        }
    }

    if symptoms.has(Symptom::Vomiting) && symptoms.has(Symptom::Diarrhea) {
        raise_to_moderate(&mut severity);
        red_flags.push(DEHYDRATION_RISK);
    }
    if symptoms.has(Symptom::Fever) && symptoms.any(&[Symptom::Headache, Symptom::BodyPain]) {
        raise_to_moderate(&mut severity);
    }
    if symptoms.has(Symptom::Injury) {
        raise_to_moderate(&mut severity);
    }

    (severity, red_flags)
}

// =============================================================================
// Care plan
// =============================================================================

/// Structured advice returned alongside the reply as `actions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CarePlan {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub possible_causes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub self_care: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub otc: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub monitoring: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seek_help: Vec<String>,
}

fn push_all(list: &mut Vec<String>, items: &[&str]) {
    list.extend(items.iter().map(|s| s.to_string()));
}

/// Build the care plan and severity for detected symptoms.
pub fn care_plan(symptoms: &Symptoms) -> (Severity, CarePlan) {
    use Symptom::*;

    let mut plan = CarePlan::default();

    let causes = &mut plan.possible_causes;
    if symptoms.has(Fever) && symptoms.any(&[Cough, Cold, BodyPain]) {
        push_all(causes, &["Viral fever / common respiratory infection"]);
    }
    if symptoms.has(SoreThroat) {
        push_all(causes, &["Viral pharyngitis"]);
    }
    if symptoms.has(Stomach) && symptoms.any(&[Vomiting, Diarrhea]) {
        push_all(causes, &["Gastroenteritis (stomach infection)"]);
    }
    if symptoms.has(Injury) {
        push_all(causes, &["Musculoskeletal injury"]);
    }
    if symptoms.has(ChestPain) {
        push_all(causes, &["Chest discomfort — needs medical evaluation"]);
    }
    if symptoms.has(Breathlessness) {
        push_all(causes, &["Breathing difficulty — possible asthma/respiratory issue"]);
    }

    push_all(
        &mut plan.self_care,
        &[
            "Rest and avoid strenuous activity",
            "Hydrate well (water/ORS/soups) — small, frequent sips",
            "Light, easy-to-digest meals (khichdi, soups, bananas, curd rice)",
        ],
    );
    if symptoms.any(&[SoreThroat, Cough, Cold]) {
        push_all(
            &mut plan.self_care,
            &["Warm saline gargles 2–3×/day", "Steam inhalation 1–2×/day"],
        );
    }
    if symptoms.has(Injury) {
        push_all(
            &mut plan.self_care,
            &["RICE: Rest, Ice (15–20 min), Compression, Elevation"],
        );
    }

    if symptoms.any(&[Fever, Headache, BodyPain]) {
        push_all(&mut plan.otc, &["Paracetamol 500 mg as per label (avoid overdose)"]);
    }
    if symptoms.any(&[Cold, Cough, SoreThroat]) {
        push_all(&mut plan.otc, &["Warm fluids, lozenges; cough syrup as per label"]);
    }
    if symptoms.any(&[Vomiting, Diarrhea]) {
        push_all(&mut plan.otc, &["Oral Rehydration Solution (ORS) after each loose stool"]);
    }

    push_all(
        &mut plan.monitoring,
        &[
            "Check temperature 2–3×/day if fever",
            "Watch urine output/dizziness/dry mouth (dehydration signs)",
            "Note worsening symptoms, rash, confusion, or persistent high fever",
        ],
    );

    let (severity, red_flags) = assess_severity(symptoms);
    if severity == Severity::Urgent {
        push_all(
            &mut plan.seek_help,
            &[
                "Immediate medical care/ER for chest pain or breathing difficulty",
                "Go to ER for fainting, confusion, blue lips, or severe persistent pain",
            ],
        );
    } else {
        push_all(
            &mut plan.seek_help,
            &["Consult a clinician if symptoms persist >72 hours or worsen"],
        );
        if red_flags.contains(&DEHYDRATION_RISK) {
            push_all(
                &mut plan.seek_help,
                &["See a clinician if you cannot keep fluids down or urine output drops"],
            );
        }
    }

    (severity, plan)
}

// =============================================================================
// Reply
// =============================================================================

fn opening(severity: Severity) -> &'static str {
    match severity {
        Severity::Urgent => "Thanks for sharing — some of what you described can be serious.",
        Severity::Moderate => "Thanks — I can suggest steps to help you feel better.",
        Severity::Low | Severity::Unknown => "Got it — here are a few steps that usually help.",
    }
}

fn push_section(lines: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("\n**{}**", heading));
    lines.extend(items.iter().map(|item| format!("- {}", item)));
}

/// Render the reply text for a cleaned user message.
pub fn compose_reply(user_text: &str, severity: Severity, plan: &CarePlan) -> String {
    let mut lines = vec![opening(severity).to_string()];

    if !plan.possible_causes.is_empty() {
        lines.push(format!(
            "\n**Possible cause(s):** {}",
            plan.possible_causes.join("; ")
        ));
    }
    push_section(&mut lines, "Do now:", &plan.self_care);
    push_section(
        &mut lines,
        "Over-the-counter options (check label & allergies):",
        &plan.otc,
    );
    push_section(&mut lines, "Monitor:", &plan.monitoring);
    push_section(&mut lines, "Seek medical help if:", &plan.seek_help);

    lines.push(
        "\n*Note: General guidance only — not a diagnosis. For emergencies, seek immediate care.*"
            .to_string(),
    );
    if user_text.chars().count() <= ECHO_LIMIT {
        lines.push(format!(
            "\n> You said: “{}”. I tailored the steps based on those symptoms.",
            user_text
        ));
    }
    lines.join("\n")
}

/// Outcome of assessing one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub reply: String,
    pub severity: Severity,
    /// Empty when no symptom was recognized.
    pub plan: CarePlan,
}

/// Assess a user message end to end.
pub fn assess(user_text: &str) -> Assessment {
    let text = clean_text(user_text);
    let symptoms = Symptoms::detect(&text);
    if symptoms.is_empty() {
        return Assessment {
            reply: NO_SYMPTOMS_REPLY.to_string(),
            severity: Severity::Unknown,
            plan: CarePlan::default(),
        };
    }
    let (severity, plan) = care_plan(&symptoms);
    tracing::debug!(
        symptoms = ?symptoms.iter().collect::<Vec<_>>(),
        severity = %severity,
        "Message assessed"
    );
    Assessment {
        reply: compose_reply(&text, severity, &plan),
        severity,
        plan,
    }
}

// =============================================================================
// Tests
// =============================================================================
