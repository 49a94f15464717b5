//! LinkedIn "Easy Apply".

use super::{PlatformProfile, SearchUrl};
use crate::automation::extractor::PostingSelectors;
use crate::automation::form_walker::FormSelectors;
use crate::browser::Locator;

pub const PROFILE: PlatformProfile = PlatformProfile {
    name: "linkedin",
    login_url: "https://www.linkedin.com/login",
    cookie_accept: Some(Locator::XPath(r#"//button[contains(text(), "Accept")]"#)),
    username_field: Locator::Css("#username"),
    login_continue: None,
    password_field: Locator::Css("#password"),
    login_submit: Locator::XPath(r#"//button[@type="submit"]"#),
    logged_in_marker: Locator::XPath(r#"//input[contains(@aria-label, "Search")]"#),
    search: SearchUrl {
        base: "https://www.linkedin.com/jobs/search/",
        keyword_param: "keywords",
        location_param: "location",
        // Easy Apply postings only.
        extra: &[("f_AL", "true")],
    },
    posting_card: Locator::XPath(r#"//li[contains(@class, "jobs-search-results__list-item")]"#),
    posting: PostingSelectors {
        title: Locator::XPath(r#"//h2[contains(@class, "jobs-details-top-card__job-title")]"#),
        company: Locator::XPath(
            r#"//a[contains(@class, "jobs-details-top-card__company-url")]"#,
        ),
        description: Locator::XPath(r#"//div[contains(@class, "jobs-description")]"#),
        card_link: Locator::Css("a.job-card-list__title, a.job-card-container__link"),
        canonical_url: Some("https://www.linkedin.com/jobs/view/{id}/"),
    },
    apply_button: Locator::XPath(r#"//button[contains(@class, "jobs-apply-button")]"#),
    apply_frame: None,
    form: FormSelectors {
        modal: Locator::Css("div.jobs-easy-apply-modal"),
        file_input: Locator::XPath(r#"//input[contains(@name, "file")]"#),
        next_button: Locator::XPath(
            r#"//button[contains(@aria-label, "Continue to next step") or contains(@aria-label, "Review your application")]"#,
        ),
        submit_button: Locator::XPath(r#"//button[contains(@aria-label, "Submit application")]"#),
        confirmation_dismiss: Locator::XPath(
            r#"//div[contains(@class, "artdeco-modal")]//button[contains(@aria-label, "Dismiss")]"#,
        ),
        cancel_button: Locator::XPath(
            r#"//div[contains(@class, "jobs-easy-apply-modal")]//button[contains(@aria-label, "Dismiss")]"#,
        ),
        discard_button: Locator::XPath(
            r#"//button[@data-control-name="discard_application_confirm_btn"]"#,
        ),
        required_text_fields: Locator::XPath(
            r#"//div[contains(@class, "jobs-easy-apply-modal")]//*[(self::input[@type="text" or @type="tel" or @type="email" or @type="number"] or self::textarea) and (@required or @aria-required="true")]"#,
        ),
        required_radio_groups: Locator::XPath(
            r#"//div[contains(@class, "jobs-easy-apply-modal")]//fieldset[@data-test-form-builder-radio-button-form-component="true"]"#,
        ),
        radio_option: Locator::Css(r#"input[type="radio"]"#),
    },
};
