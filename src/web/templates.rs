use crate::admin::{AdminPortal, AdminTab, Involvement, ProvisioningForm};
use crate::view::{CardView, LOADING_PLACEHOLDER};
use askama::Template;

#[derive(Template)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub message: &'static str,
    pub refresh_secs: u32,
}

impl Default for LoadingTemplate {
    fn default() -> Self {
        Self {
            message: LOADING_PLACEHOLDER,
            refresh_secs: 1,
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub login_url: &'static str,
}

#[derive(Template)]
#[template(path = "card.html")]
pub struct CardTemplate {
    pub card: CardView,
}

pub struct InvolvementOption {
    pub value: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub invite_tab: bool,
    pub invite_email: String,
    pub invite_pending: bool,
    pub invite_message: Option<String>,
    pub form: ProvisioningForm,
    pub involvement_options: Vec<InvolvementOption>,
    pub create_pending: bool,
    pub create_message: Option<String>,
}

impl AdminTemplate {
    pub fn new(admin: &AdminPortal) -> Self {
        let form = admin.provisioning.form.clone();
        let involvement_options = Involvement::ALL
            .iter()
            .map(|involvement| InvolvementOption {
                value: involvement.as_str(),
                selected: *involvement == form.involvement,
            })
            .collect();

        Self {
            invite_tab: admin.tab == AdminTab::Invite,
            invite_email: admin.invite.email.clone(),
            invite_pending: admin.invite.submit.is_pending(),
            invite_message: admin.invite.submit.message().map(str::to_string),
            form,
            involvement_options,
            create_pending: admin.provisioning.submit.is_pending(),
            create_message: admin.provisioning.submit.message().map(str::to_string),
        }
    }
}
