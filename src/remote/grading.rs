//! PSA certification lookups used to pre-fill graded items.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::api_types::{ApiCertResponse, ApiPsaCert, ApiPsaImage};
use super::{error_for_response, USER_AGENT};
use crate::collection::{Category, Item};
use crate::config::GradingConfig;
use crate::error::{Error, Result};

pub const PSA: &str = "PSA";

/// A graded card as reported by the grading company.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedCard {
  pub company: String,
  pub grade: String,
  pub name: String,
  pub set: String,
  pub card_number: String,
  pub rarity: String,
  pub cert_number: String,
  pub spec_number: Option<String>,
  pub year: Option<String>,
  pub total_population: Option<u64>,
  pub population_higher: Option<u64>,
  pub image_url: Option<String>,
}

impl GradedCard {
  fn from_cert(cert: ApiPsaCert, requested: &str) -> Self {
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let grade = non_empty(cert.card_grade)
      .or_else(|| non_empty(cert.grade_description))
      .unwrap_or_else(|| "Unknown".to_string());

    Self {
      company: PSA.to_string(),
      grade,
      name: non_empty(cert.subject).unwrap_or_else(|| "Unknown Card".to_string()),
      set: parse_psa_brand(cert.brand.as_deref()),
      card_number: cert.card_number.unwrap_or_default(),
      rarity: non_empty(cert.variety).unwrap_or_else(|| "Unknown".to_string()),
      cert_number: non_empty(cert.cert_number).unwrap_or_else(|| requested.to_string()),
      spec_number: cert.spec_number,
      year: cert.year,
      total_population: cert.total_population,
      population_higher: cert.population_higher,
      image_url: None,
    }
  }

  /// New graded item with everything the certificate tells us filled in.
  pub fn to_item(&self) -> Item {
    let mut item = Item::new(self.name.clone(), self.set.clone(), Category::Graded);
    item.card_number = Some(self.card_number.clone()).filter(|s| !s.is_empty());
    item.rarity = Some(self.rarity.clone());
    item.condition = self.grade.clone();
    item.grading_company = Some(self.company.clone());
    item.certification_number = Some(self.cert_number.clone());
    item.product_type = Some("single".to_string());
    if let Some(image) = &self.image_url {
      item.image = image.clone();
    }
    item
  }
}

/// Client for the PSA public API.
#[derive(Clone)]
pub struct PsaClient {
  client: Client,
  api_base: Url,
  token: String,
}

impl PsaClient {
  pub fn new(config: &GradingConfig, token: String) -> Result<Self> {
    if token.is_empty() {
      return Err(Error::MissingCredential);
    }

    // Url::join drops the last path segment unless it ends in a slash
    let mut base = config.api_base.clone();
    if !base.ends_with('/') {
      base.push('/');
    }
    let api_base = Url::parse(&base)
      .map_err(|e| Error::Malformed(format!("grading api_base '{}': {}", config.api_base, e)))?;

    let client = Client::builder()
      .user_agent(USER_AGENT)
      .timeout(Duration::from_secs(30))
      .build()?;

    Ok(Self {
      client,
      api_base,
      token,
    })
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let url = self
      .api_base
      .join(path)
      .map_err(|e| Error::Malformed(format!("grading endpoint '{}': {}", path, e)))?;
    debug!("GET {}", url);

    let response = self
      .client
      .get(url)
      .bearer_auth(&self.token)
      .header(reqwest::header::ACCEPT, "application/json")
      .send()
      .await?;

    if !response.status().is_success() {
      return Err(error_for_response(response).await);
    }
    Ok(serde_json::from_str(&response.text().await?)?)
  }

  /// Look up a certificate. Unknown numbers come back as `NotFound`.
  pub async fn lookup(&self, cert_number: &str) -> Result<GradedCard> {
    let cert_number = cert_number.trim();
    if cert_number.is_empty() {
      return Err(Error::Validation {
        line: 0,
        message: "certification number is empty".to_string(),
      });
    }

    let response: ApiCertResponse = self
      .get_json(&format!("cert/GetByCertNumber/{}", cert_number))
      .await?;

    let cert = response.psa_cert.ok_or_else(|| {
      Error::Malformed("no PSA certification data in response".to_string())
    })?;

    let mut card = GradedCard::from_cert(cert, cert_number);
    card.image_url = self.front_image(cert_number).await;
    info!("PSA cert {} is {} ({})", cert_number, card.name, card.grade);
    Ok(card)
  }

  /// Front image if there is one, else whatever image comes first.
  async fn front_image(&self, cert_number: &str) -> Option<String> {
    match self
      .get_json::<Vec<ApiPsaImage>>(&format!("cert/GetImagesByCertNumber/{}", cert_number))
      .await
    {
      Ok(images) => pick_image(images),
      Err(e) => {
        warn!("PSA image lookup failed for {}: {}", cert_number, e);
        None
      }
    }
  }
}

fn pick_image(images: Vec<ApiPsaImage>) -> Option<String> {
  let front = images
    .iter()
    .find(|img| img.is_front_image)
    .and_then(|img| img.image_url.clone());
  front.or_else(|| images.into_iter().next().and_then(|img| img.image_url))
}

/// Set name from a PSA brand string.
///
/// "POKEMON TWM EN-TWILIGHT MASQUERADE" becomes "Twilight Masquerade",
/// "POKEMON BASE SET" becomes "Base Set".
pub fn parse_psa_brand(brand: Option<&str>) -> String {
  let brand = match brand {
    Some(b) if !b.is_empty() => b,
    _ => return "Unknown Set".to_string(),
  };

  let mut rest = strip_prefix_ignore_case(brand, "POKEMON")
    .map(str::trim_start)
    .unwrap_or(brand);
  rest = strip_language_code(rest);

  let titled = title_case(rest);
  if titled.is_empty() {
    "Unknown Set".to_string()
  } else {
    titled
  }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
  let head = s.get(..prefix.len())?;
  head
    .eq_ignore_ascii_case(prefix)
    .then(|| &s[prefix.len()..])
}

/// Drops a leading set code followed by `EN-`, as in "TWM EN-".
fn strip_language_code(s: &str) -> &str {
  let code_len = s.chars().take_while(char::is_ascii_alphabetic).count();
  if code_len == 0 {
    return s;
  }

  // The code itself may end in "EN" when no space separates them
  for split in (1..=code_len).rev() {
    let after = s[split..].trim_start();
    if let Some(rest) = strip_prefix_ignore_case(after, "EN-") {
      return rest;
    }
  }
  s
}

fn title_case(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut in_word = false;
  for c in s.chars() {
    let is_word = c.is_alphanumeric() || c == '_';
    if is_word && !in_word {
      out.extend(c.to_uppercase());
    } else {
      out.extend(c.to_lowercase());
    }
    in_word = is_word;
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_brand_with_code() {
    assert_eq!(
      parse_psa_brand(Some("POKEMON TWM EN-TWILIGHT MASQUERADE")),
      "Twilight Masquerade"
    );
  }

  #[test]
  fn test_parse_brand_plain() {
    assert_eq!(parse_psa_brand(Some("POKEMON BASE SET")), "Base Set");
    assert_eq!(parse_psa_brand(Some("Pokemon Jungle")), "Jungle");
    assert_eq!(parse_psa_brand(Some("POKEMON SUN & MOON")), "Sun & Moon");
  }

  #[test]
  fn test_parse_brand_defaults() {
    assert_eq!(parse_psa_brand(None), "Unknown Set");
    assert_eq!(parse_psa_brand(Some("")), "Unknown Set");
    assert_eq!(parse_psa_brand(Some("POKEMON")), "Unknown Set");
  }

  #[test]
  fn test_parse_brand_code_without_space() {
    assert_eq!(parse_psa_brand(Some("POKEMON SVIEN-SCARLET")), "Scarlet");
  }

  #[test]
  fn test_cert_mapping_defaults() {
    let cert = ApiPsaCert {
      card_grade: None,
      grade_description: Some("GEM MT 10".to_string()),
      ..Default::default()
    };
    let card = GradedCard::from_cert(cert, "12345678");
    assert_eq!(card.name, "Unknown Card");
    assert_eq!(card.set, "Unknown Set");
    assert_eq!(card.grade, "GEM MT 10");
    assert_eq!(card.rarity, "Unknown");
    assert_eq!(card.cert_number, "12345678");
  }

  #[test]
  fn test_cert_json() {
    let body = r#"{"PSACert":{"CertNumber":"87654321","Year":"1999","Brand":"POKEMON GAME",
      "Subject":"CHARIZARD-HOLO","CardNumber":"4","Variety":"1ST EDITION",
      "CardGrade":"NM-MT 8","TotalPopulation":1200,"PopulationHigher":300}}"#;
    let response: ApiCertResponse = serde_json::from_str(body).unwrap();
    let card = GradedCard::from_cert(response.psa_cert.unwrap(), "87654321");
    assert_eq!(card.set, "Game");
    assert_eq!(card.grade, "NM-MT 8");
    assert_eq!(card.total_population, Some(1200));

    let item = card.to_item();
    assert_eq!(item.category, Category::Graded);
    assert_eq!(item.grading_company.as_deref(), Some("PSA"));
    assert_eq!(item.certification_number.as_deref(), Some("87654321"));
    assert_eq!(item.condition, "NM-MT 8");
  }

  #[test]
  fn test_pick_image_prefers_front() {
    let images: Vec<ApiPsaImage> = serde_json::from_str(
      r#"[{"IsFrontImage":false,"ImageURL":"back.jpg"},{"IsFrontImage":true,"ImageURL":"front.jpg"}]"#,
    )
    .unwrap();
    assert_eq!(pick_image(images).as_deref(), Some("front.jpg"));

    let images: Vec<ApiPsaImage> =
      serde_json::from_str(r#"[{"IsFrontImage":false,"ImageURL":"back.jpg"}]"#).unwrap();
    assert_eq!(pick_image(images).as_deref(), Some("back.jpg"));
    assert_eq!(pick_image(Vec::new()), None);
  }
}
