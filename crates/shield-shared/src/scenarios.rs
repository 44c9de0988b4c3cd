//! Canned demonstration reports.
//!
//! These are selected by key and shown without any external call. They are
//! also seeded into a fresh archive so the listing is never empty.

use crate::contract::{ReportContract, STEP_TITLES};
use crate::error::{ShieldError, ShieldResult};
use crate::report::{
    ContentModel, KeyValueEntry, OptionDetail, OptionField, OptionSet, OptionSetKind,
    RecommendationBlock, ReportMeta, Step, StructuredReport,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKey {
    ParentComplaint,
    FacultyLeave,
}

impl ScenarioKey {
    pub const ALL: [ScenarioKey; 2] = [ScenarioKey::ParentComplaint, ScenarioKey::FacultyLeave];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioKey::ParentComplaint => "parent-complaint",
            ScenarioKey::FacultyLeave => "faculty-leave",
        }
    }

    /// Archive id of the seeded copy
    pub fn report_id(&self) -> String {
        format!("scenario-{}", self.as_str())
    }

    pub fn title(&self) -> &'static str {
        match self {
            ScenarioKey::ParentComplaint => {
                "Parent complaint about unfair suspension without notice"
            }
            ScenarioKey::FacultyLeave => {
                "Non-renewed faculty member wants to use sick days as vacation"
            }
        }
    }

    pub fn issue_text(&self) -> &'static str {
        match self {
            ScenarioKey::ParentComplaint => {
                "Parent complaint about unfair suspension without notice."
            }
            ScenarioKey::FacultyLeave => {
                "Non-renewed faculty member wants to use sick days as vacation before departure."
            }
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        let day = match self {
            ScenarioKey::ParentComplaint => 12,
            ScenarioKey::FacultyLeave => 10,
        };
        Utc.with_ymd_and_hms(2025, 8, day, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScenarioKey {
    type Err = ShieldError;

    /// Accepts kebab-case, snake_case and camelCase spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "parentcomplaint" => Ok(ScenarioKey::ParentComplaint),
            "facultyleave" => Ok(ScenarioKey::FacultyLeave),
            _ => Err(ShieldError::NotFound(format!("scenario '{}'", s.trim()))),
        }
    }
}

/// Build the canned report for `key`
pub fn load(key: ScenarioKey) -> ShieldResult<StructuredReport> {
    let steps = match key {
        ScenarioKey::ParentComplaint => parent_complaint_steps(),
        ScenarioKey::FacultyLeave => faculty_leave_steps(),
    };
    let meta = ReportMeta {
        id: key.report_id(),
        title: key.title().to_string(),
        issue_text: key.issue_text().to_string(),
        created_at: key.created_at(),
        scenario_key: Some(key.as_str().to_string()),
    };
    Ok(ReportContract::assemble(meta, steps)?)
}

/// Look a scenario up by its textual key
pub fn load_by_name(name: &str) -> ShieldResult<StructuredReport> {
    load(name.parse()?)
}

pub fn all() -> ShieldResult<Vec<StructuredReport>> {
    ScenarioKey::ALL.into_iter().map(load).collect()
}

fn kv(index: u8, entries: &[(&str, &str)]) -> Step {
    Step::new(
        index,
        STEP_TITLES[index as usize - 1],
        ContentModel::KeyValueList(
            entries
                .iter()
                .map(|(h, t)| KeyValueEntry::new(*h, *t))
                .collect(),
        ),
    )
}

struct ResponseOption<'a> {
    title: &'a str,
    suggested_language: &'a str,
    policy_match: &'a str,
    risk_score: &'a str,
    legal_reference: &'a str,
    recommendation: &'a str,
}

impl ResponseOption<'_> {
    fn detail(&self) -> OptionDetail {
        OptionDetail::new(
            self.title,
            vec![
                (OptionField::SuggestedLanguage, self.suggested_language.into()),
                (OptionField::PolicyMatch, self.policy_match.into()),
                (OptionField::RiskScore, self.risk_score.into()),
                (OptionField::LegalReference, self.legal_reference.into()),
                (OptionField::Recommendation, self.recommendation.into()),
            ],
        )
    }
}

struct Reaction<'a> {
    title: &'a str,
    likely_response: &'a str,
    school_risk: &'a str,
    legal_reference: &'a str,
}

impl Reaction<'_> {
    fn detail(&self) -> OptionDetail {
        OptionDetail::new(
            self.title,
            vec![
                (OptionField::LikelyResponse, self.likely_response.into()),
                (OptionField::SchoolRisk, self.school_risk.into()),
                (OptionField::LegalReference, self.legal_reference.into()),
            ],
        )
    }
}

fn responses(options: [ResponseOption<'_>; 3]) -> Step {
    let [a, b, c] = options;
    Step::new(
        4,
        STEP_TITLES[3],
        ContentModel::OptionSet(OptionSet::new(
            OptionSetKind::ResponseOptions,
            a.detail(),
            b.detail(),
            c.detail(),
        )),
    )
}

fn reactions(options: [Reaction<'_>; 3]) -> Step {
    let [a, b, c] = options;
    Step::new(
        5,
        STEP_TITLES[4],
        ContentModel::OptionSet(OptionSet::new(
            OptionSetKind::ProjectedReactions,
            a.detail(),
            b.detail(),
            c.detail(),
        )),
    )
}

fn plan(summary: &str, steps: &[&str]) -> Step {
    Step::new(
        6,
        STEP_TITLES[5],
        ContentModel::RecommendationBlock(RecommendationBlock {
            summary: summary.to_string(),
            implementation_steps: steps.iter().map(|s| s.to_string()).collect(),
        }),
    )
}

fn parent_complaint_steps() -> Vec<Step> {
    vec![
        kv(
            1,
            &[
                ("Issue Type:", "Parent Complaint"),
                (
                    "Summary:",
                    "Parent feels blindsided by disciplinary action (suspension). Requests policy change and apology.",
                ),
                ("Stakeholders:", "Parent, Student, Faculty, Admin Team"),
            ],
        ),
        kv(
            2,
            &[
                ("Relevant Section:", "Section 4.3 – Student Discipline Procedure"),
                (
                    "Text Excerpt:",
                    "\"Disciplinary action may be taken in the best interest of the school community. Parents will be contacted as appropriate.\"",
                ),
                (
                    "Policy Gap:",
                    "No clear mandate about timing of parental notification. No explicit appeal process defined.",
                ),
            ],
        ),
        kv(
            3,
            &[
                ("Risk Tier:", "Moderate"),
                (
                    "Justification:",
                    "Policy ambiguity + use of legal language by parent (e.g. “violates rights”). High potential for reputational or legal escalation without documentation.",
                ),
            ],
        ),
        responses([
            ResponseOption {
                title: "Option A – Supportive & Investigative",
                suggested_language: "We are actively reviewing this matter to ensure all disciplinary steps align with our handbook. We appreciate your patience and will provide a full review soon.",
                policy_match: "Section 4.3 – Student Discipline Procedure",
                risk_score: "Low",
                legal_reference: "In Smith v. Westbrook Charter (2020), courts emphasized that prompt review and acknowledgment of parental concerns significantly reduced liability exposure.",
                recommendation: "Proceed. No legal escalation needed.",
            },
            ResponseOption {
                title: "Option B – Procedural + Soft Acknowledgment",
                suggested_language: "Our current disciplinary policy allows administrative discretion. While no violation occurred, we recognize communication could be improved.",
                policy_match: "Section 4.3 – Student Discipline Procedure",
                risk_score: "Moderate",
                legal_reference: "In Mason v. Eastside Prep (2021), ambiguity in school policy and failure to proactively address parent concerns resulted in the issue escalating to the board and gaining media attention.",
                recommendation: "Use cautiously. Consider offering a follow-up to reduce friction.",
            },
            ResponseOption {
                title: "Option C – Firm & Final",
                suggested_language: "The suspension followed established policy and is final. No further action is required by the school.",
                policy_match: "Section 4.3 – General Interpretation",
                risk_score: "High",
                legal_reference: "In Parent v. Beacon Hill Christian (2020), a rigid response without acknowledgment of parental concern resulted in negative publicity and a costly settlement due to failure to follow communication best practices.",
                recommendation: "Not advised. May escalate tensions and introduce legal or reputational risk.",
            },
        ]),
        reactions([
            Reaction {
                title: "Option A",
                likely_response: "Parent appreciates the acknowledgment and feels heard. May request a brief meeting for clarity, but escalation is unlikely.",
                school_risk: "Low – Positive tone and willingness to investigate usually results in resolution without further action.",
                legal_reference: "Doe v. Heritage Academy (2019) – School protected after showing procedural review in response to parental concern.",
            },
            Reaction {
                title: "Option B",
                likely_response: "Parent feels partially heard but remains concerned. May request documentation or a policy review meeting. Possible follow-up to school board.",
                school_risk: "Moderate – While language is neutral, absence of apology or proactive follow-up could be perceived as dismissive. Reputation risk increases with repeat complaints.",
                legal_reference: "Mason v. Eastside Prep (2021) – Lack of communication clarity contributed to prolonged parent conflict and board involvement.",
            },
            Reaction {
                title: "Option C",
                likely_response: "Parent views this as stonewalling. Likely to escalate to school board or external legal advisory. May take issue to social media or local press, claiming rights were ignored.",
                school_risk: "High – This tone invites resistance, lacks empathy, and contradicts best practices for early-stage resolution. Serious PR and legal exposure possible.",
                legal_reference: "Parent v. Beacon Hill Christian (2020) – Firm denial without engagement led to settlement due to public backlash and lack of documentation.",
            },
        ]),
        plan(
            "**Recommended Option:** Option A\n**Why:** Demonstrates due diligence, protects school reputation, and aligns with a restorative tone. Legal precedent supports early review and acknowledgment of parental concerns.\n**Confidence Level:** High\n**Legal Review Advised:** Not required unless the parent submits a formal complaint or legal threat.",
            &[
                "1. **Acknowledge:** Immediately contact the parent to acknowledge receipt of their complaint and inform them that a review is underway.",
                "2. **Investigate:** Interview all relevant staff and review any documentation related to the suspension.",
                "3. **Document:** Create a timeline of events and a summary of findings from the investigation.",
                "4. **Communicate:** Schedule a follow-up meeting with the parent to discuss the findings and the school's position.",
                "5. **Policy Review:** Flag the 'Student Discipline Procedure' for the next handbook review to add clarity regarding parental notification timelines.",
            ],
        ),
    ]
}

fn faculty_leave_steps() -> Vec<Step> {
    vec![
        kv(
            1,
            &[
                ("Issue Type:", "Employee Leave/Separation Inquiry"),
                (
                    "Summary:",
                    "A non-renewed faculty member requests to use accrued sick days as vacation prior to their final day of employment.",
                ),
                (
                    "Stakeholders:",
                    "Faculty Member, Head of School, Director of Finance/HR.",
                ),
            ],
        ),
        kv(
            2,
            &[
                (
                    "Relevant Sections:",
                    "5.7 (Leave from Work), 5.6 (Vacation Time), 4.3 (Separation from Employment)",
                ),
                (
                    "Text Excerpts:",
                    "\"Faculty members are not entitled to vacation time.\" \"Employees will not be paid for any unused sick leave upon termination or retirement...\" \"Included in the definition of sick leave are absences for reasons clearly beyond the control of the employee: personal illness, illness or death of an immediate family member...\"",
                ),
                (
                    "Policy Clarity:",
                    "The policy is clear. Sick leave is for specific, approved reasons and is not a cash benefit or interchangeable with vacation, which faculty do not receive.",
                ),
            ],
        ),
        kv(
            3,
            &[
                ("Risk Tier:", "Low to Moderate"),
                (
                    "Justification:",
                    "The policy is clear, reducing legal risk. However, the employee is being non-renewed, creating a sensitive situation. A poorly handled response could lead to a baseless wrongful termination claim or negative sentiment. The risk is primarily in relationship management.",
                ),
            ],
        ),
        responses([
            ResponseOption {
                title: "Option A – Firm, Policy-Based, & Supportive",
                suggested_language: "Thank you for your inquiry. Per our employee handbook (Section 5.7), sick leave is designated for illness and other specified emergencies and is not convertible to vacation time. Additionally, the handbook states that unused sick leave is not paid out upon separation. We can, however, schedule a meeting to discuss your final pay and benefits transition to ensure a smooth departure.",
                policy_match: "Section 5.7, 4.3",
                risk_score: "Low",
                legal_reference: "Cites *Johnson v. Independent School District No. 4*, where courts upheld an employer's right to enforce clear, written leave policies, especially when distinguishing between sick and vacation leave. Emphasizes the importance of consistent policy application.",
                recommendation: "Proceed. This is the most direct and legally sound approach.",
            },
            ResponseOption {
                title: "Option B – Accommodating / Exception-Based",
                suggested_language: "While our policy doesn't typically allow for this, we can make an exception in this case and allow you to use a portion of your sick leave before your departure.",
                policy_match: "N/A - Contradicts policy",
                risk_score: "High",
                legal_reference: "Cites *Davis v. Charter School Partners*, where making an exception for one employee created a precedent that the school was later forced to honor for others, leading to significant unplanned costs. Inconsistent policy application creates risk of discrimination claims.",
                recommendation: "Not advised. Creates a dangerous precedent and undermines the handbook.",
            },
            ResponseOption {
                title: "Option C – Vague & Deferring",
                suggested_language: "We will need to review your request with the business office and will get back to you at a later date.",
                policy_match: "N/A",
                risk_score: "Moderate",
                legal_reference: "In *Chen v. Academy of Arts*, delaying a clear answer on a separation-related matter was interpreted as evasive, increasing employee frustration and contributing to a constructive discharge claim (though ultimately unsuccessful, it was costly to defend).",
                recommendation: "Not advised. Delays a clear answer and can create false hope, leading to more frustration.",
            },
        ]),
        reactions([
            Reaction {
                title: "Option A",
                likely_response: "Employee may be disappointed but understands the decision is based on established policy, not personal animus. Escalation is unlikely as the policy is clear.",
                school_risk: "Low – The decision is defensible and based on consistent application of written policy.",
                legal_reference: "Johnson v. Independent School District No. 4 – Consistent enforcement of a clear, written leave policy was upheld.",
            },
            Reaction {
                title: "Option B",
                likely_response: "Employee is satisfied. However, this may create morale issues with other staff who were not granted similar exceptions. Sets a precedent for future requests upon separation.",
                school_risk: "High – Future employees could claim discrimination if not offered the same benefit, undermining the handbook.",
                legal_reference: "Davis v. Charter School Partners – A one-off exception became a precedent the school was later required to honor.",
            },
            Reaction {
                title: "Option C",
                likely_response: "Employee becomes anxious and frustrated by the delay. May begin to feel they are being treated unfairly, increasing the likelihood of consulting legal counsel or complaining to other staff.",
                school_risk: "Moderate – The ambiguity and delay can be perceived as weakness or unfair treatment, potentially escalating the situation.",
                legal_reference: "Chen v. Academy of Arts – Delay on a separation matter was read as evasive and prolonged a costly dispute.",
            },
        ]),
        plan(
            "**Recommended Option:** Option A\n**Why:** It is clear, consistent, and directly supported by the employee handbook. It respects the employee by providing a direct answer while protecting the school from the significant risks of inconsistent policy application.\n**Confidence Level:** High\n**Legal Review Advised:** Not required unless the employee threatens legal action or alleges the policy is being applied in a discriminatory manner.",
            &[
                "1. **Draft Communication:** Prepare a clear, supportive email based on the language in Option A.",
                "2. **Send Email:** Send the communication to the faculty member promptly.",
                "3. **Schedule Meeting:** Proactively offer to schedule a meeting with HR/Finance to discuss their final pay and benefits.",
                "4. **Document:** Place a copy of the communication in the employee's official file.",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_scenario_satisfies_contract() {
        for key in ScenarioKey::ALL {
            let report = load(key).unwrap();
            assert_eq!(report.steps().len(), 6);
            assert_eq!(report.scenario_key(), Some(key.as_str()));
        }
    }

    #[test]
    fn test_key_spellings() {
        assert_eq!(
            "parentComplaint".parse::<ScenarioKey>().unwrap(),
            ScenarioKey::ParentComplaint
        );
        assert_eq!(
            "faculty_leave".parse::<ScenarioKey>().unwrap(),
            ScenarioKey::FacultyLeave
        );
        let err = "bus-incident".parse::<ScenarioKey>().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn test_seeded_dates() {
        let parent = load(ScenarioKey::ParentComplaint).unwrap();
        assert_eq!(parent.summary().date_label(), "August 12, 2025");
        let faculty = load(ScenarioKey::FacultyLeave).unwrap();
        assert_eq!(faculty.summary().date_label(), "August 10, 2025");
    }
}
