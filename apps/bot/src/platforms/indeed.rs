//! Indeed. Sign-in is two-step and the apply flow is framed.

use super::{PlatformProfile, SearchUrl};
use crate::automation::extractor::PostingSelectors;
use crate::automation::form_walker::FormSelectors;
use crate::browser::Locator;

pub const PROFILE: PlatformProfile = PlatformProfile {
    name: "indeed",
    login_url: "https://secure.indeed.com/account/login",
    cookie_accept: Some(Locator::Css("#onetrust-accept-btn-handler")),
    username_field: Locator::Css(r#"input[type="email"]"#),
    login_continue: Some(Locator::XPath(r#"//button[@type="submit"]"#)),
    password_field: Locator::Css(r#"input[type="password"]"#),
    login_submit: Locator::XPath(r#"//button[@type="submit" and not(@disabled)]"#),
    logged_in_marker: Locator::Css("#jobsearch, #text-input-what"),
    search: SearchUrl {
        base: "https://www.indeed.com/jobs",
        keyword_param: "q",
        location_param: "l",
        // "Easily apply" filter.
        extra: &[("sc", "0kf:attr(DSQF7);")],
    },
    posting_card: Locator::XPath(r#"//div[contains(@class, "job_seen_beacon")]"#),
    posting: PostingSelectors {
        title: Locator::Css(r#"h2[data-testid="jobsearch-JobInfoHeader-title"]"#),
        company: Locator::Css(r#"div[data-testid="inlineHeader-companyName"]"#),
        description: Locator::Css("#jobDescriptionText"),
        card_link: Locator::Css("a.jcs-JobTitle"),
        canonical_url: Some("https://www.indeed.com/viewjob?jk={id}"),
    },
    apply_button: Locator::XPath(r#"//button[contains(@id, "applyButton")]"#),
    apply_frame: Some(Locator::XPath(r#"//iframe[@id="vjs-container-iframe"]"#)),
    form: FormSelectors {
        modal: Locator::Css("#ia-container, main.ia-BasePage"),
        file_input: Locator::XPath(r#"//input[@type="file"]"#),
        next_button: Locator::XPath(
            r#"//button[contains(@class, "ia-continueButton") or .//span[text()="Continue"]]"#,
        ),
        submit_button: Locator::XPath(
            r#"//button[contains(text(), "Submit") or .//span[contains(text(), "Submit")]]"#,
        ),
        confirmation_dismiss: Locator::XPath(r#"//button[contains(@aria-label, "close")]"#),
        cancel_button: Locator::XPath(r#"//button[text()="Cancel" or @aria-label="Exit"]"#),
        discard_button: Locator::XPath(r#"//button[contains(text(), "Discard")]"#),
        required_text_fields: Locator::XPath(
            r#"//*[(self::input[@type="text" or @type="tel" or @type="email" or @type="number"] or self::textarea) and (@required or @aria-required="true")]"#,
        ),
        required_radio_groups: Locator::XPath(
            r#"//fieldset[.//input[@type="radio" and (@required or @aria-required="true")]]"#,
        ),
        radio_option: Locator::Css(r#"input[type="radio"]"#),
    },
};
